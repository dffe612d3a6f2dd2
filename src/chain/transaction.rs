use crate::models::{Address, MicroAlgos, sha512_256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest fee a node accepts per transaction.
pub const MIN_FEE: MicroAlgos = MicroAlgos(1_000);

/// First four bytes of the SHA-512/256 of an ABI method signature.
pub fn abi_selector(signature: &str) -> [u8; 4] {
    let digest = sha512_256(&[signature.as_bytes()]);
    [digest[0], digest[1], digest[2], digest[3]]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    pub fee: MicroAlgos,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnComplete {
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxnKind {
    Payment {
        receiver: Address,
        amount: MicroAlgos,
    },
    AssetTransfer {
        receiver: Address,
        asset_id: u64,
        amount: u64,
    },
    AppCall {
        app_id: u64,
        on_complete: OnComplete,
        args: Vec<Vec<u8>>,
        foreign_assets: Vec<u64>,
    },
}

/// An unsigned transaction descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub fee: MicroAlgos,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub group: Option<GroupId>,
    pub kind: TxnKind,
}

impl Transaction {
    pub fn new(sender: Address, params: &SuggestedParams, kind: TxnKind) -> Self {
        Self {
            sender,
            fee: params.fee,
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_id: params.genesis_id.clone(),
            group: None,
            kind,
        }
    }

    /// Canonical bytes that are hashed for ids and covered by signatures.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn id(&self) -> Result<TxId, serde_json::Error> {
        let bytes = self.encode()?;
        Ok(TxId::from_digest(&sha512_256(&[&b"TX"[..], &bytes[..]])))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub [u8; 32]);

/// Stamps every transaction with the id of the whole group so the ledger
/// applies them all or none.
pub fn assign_group(txns: &mut [Transaction]) -> Result<GroupId, serde_json::Error> {
    for txn in txns.iter_mut() {
        txn.group = None;
    }
    let mut ids = Vec::with_capacity(txns.len());
    for txn in txns.iter() {
        ids.push(txn.id()?);
    }

    let mut parts: Vec<&[u8]> = vec![&b"TG"[..]];
    parts.extend(ids.iter().map(|id| id.as_str().as_bytes()));
    let group = GroupId(sha512_256(&parts));

    for txn in txns.iter_mut() {
        txn.group = Some(group);
    }
    Ok(group)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    fn from_digest(digest: &[u8; 32]) -> Self {
        // Upper-case hex keeps ids copy-pasteable from the console.
        TxId(digest.iter().map(|b| format!("{:02X}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub signer: Address,
    pub sig: Vec<u8>,
}

/// Signature digest binding a signer key to the canonical transaction bytes.
pub fn signature_digest(signer: &Address, txn_bytes: &[u8]) -> Vec<u8> {
    sha512_256(&[&b"SIG"[..], &signer.public_key()[..], txn_bytes]).to_vec()
}

/// An asset transfer the application made while executing a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTransfer {
    pub receiver: Address,
    pub asset_id: u64,
    pub amount: u64,
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub txid: TxId,
    pub round: u64,
    pub confirmed_at: DateTime<Utc>,
    pub inner_transfers: Vec<InnerTransfer>,
}

impl Confirmation {
    /// Total of `asset_id` the transaction's inner transfers sent to `receiver`.
    pub fn asset_received(&self, receiver: &Address, asset_id: u64) -> Option<u64> {
        self.inner_transfers
            .iter()
            .filter(|t| &t.receiver == receiver && t.asset_id == asset_id)
            .try_fold(0u64, |total, t| total.checked_add(t.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: MIN_FEE,
            first_valid: 1,
            last_valid: 1001,
            genesis_id: "testnet-v1.0".to_string(),
        }
    }

    fn payment(amount: u64) -> Transaction {
        Transaction::new(
            Address::from_seed(b"alice"),
            &params(),
            TxnKind::Payment {
                receiver: Address::for_application(7),
                amount: MicroAlgos(amount),
            },
        )
    }

    #[test]
    fn ids_differ_by_content() {
        assert_eq!(payment(1).id().unwrap(), payment(1).id().unwrap());
        assert_ne!(payment(1).id().unwrap(), payment(2).id().unwrap());
    }

    #[test]
    fn grouping_stamps_every_member_and_changes_ids() {
        let mut txns = vec![payment(1), payment(2)];
        let before = txns[0].id().unwrap();
        let group = assign_group(&mut txns).unwrap();
        assert!(txns.iter().all(|t| t.group == Some(group)));
        assert_ne!(txns[0].id().unwrap(), before);

        // Regrouping the same members is stable.
        let again = assign_group(&mut txns).unwrap();
        assert_eq!(group, again);
    }

    #[test]
    fn signed_transactions_survive_the_wire() {
        let txn = payment(5);
        let signer = txn.sender.clone();
        let sig = signature_digest(&signer, &txn.encode().unwrap());
        let signed = SignedTransaction { txn, signer, sig };
        let bytes = serde_json::to_vec(&signed).unwrap();
        let back: SignedTransaction = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.txn, signed.txn);
        assert_eq!(back.sig, signed.sig);
    }

    #[test]
    fn selector_is_four_bytes_of_the_signature_hash() {
        assert_eq!(abi_selector("donate()void"), abi_selector("donate()void"));
        assert_ne!(abi_selector("donate()void"), abi_selector("get_asset_id()uint64"));
    }
}
