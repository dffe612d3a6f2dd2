use crate::chain::LedgerClient;
use crate::chain::transaction::{
    Confirmation, InnerTransfer, MIN_FEE, OnComplete, SignedTransaction, SuggestedParams,
    Transaction, TxId, TxnKind, abi_selector, assign_group, signature_digest,
};
use crate::error::LedgerError;
use crate::models::{Address, MicroAlgos};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Mutex;

/// Micro-ALGO donated per ANJ handed back (1 ALGO buys 10 ANJ).
const MICROALGOS_PER_TOKEN: u64 = 100_000;
/// ANJ minted into the application escrow when the ledger starts.
const TOKEN_SUPPLY: u64 = 10_000_000;
const VALIDITY_WINDOW: u64 = 1_000;

#[derive(Debug, Clone, Default)]
struct AccountState {
    algos: MicroAlgos,
    // None until the account opts in to the token.
    tokens: Option<u64>,
}

#[derive(Debug, Clone)]
struct LedgerState {
    round: u64,
    accounts: HashMap<Address, AccountState>,
}

/// A single-node ledger that runs the donation application in process.
///
/// Groups are applied against a scratch copy of the account table and only
/// committed when every member passes, so a group succeeds or fails as one.
pub struct SimulatedLedger {
    app_id: u64,
    asset_id: u64,
    genesis_id: String,
    app_address: Address,
    state: Mutex<LedgerState>,
    confirmed: Mutex<HashMap<TxId, Confirmation>>,
}

impl SimulatedLedger {
    pub fn new(app_id: u64, asset_id: u64, genesis_id: &str) -> Self {
        let app_address = Address::for_application(app_id);
        let mut accounts = HashMap::new();
        accounts.insert(
            app_address.clone(),
            AccountState {
                algos: MicroAlgos::ZERO,
                tokens: Some(TOKEN_SUPPLY),
            },
        );
        Self {
            app_id,
            asset_id,
            genesis_id: genesis_id.to_string(),
            app_address,
            state: Mutex::new(LedgerState { round: 1, accounts }),
            confirmed: Mutex::new(HashMap::new()),
        }
    }

    pub fn app_address(&self) -> &Address {
        &self.app_address
    }

    /// Dispenser: tops up an account with ALGO.
    pub fn fund(&self, address: &Address, amount: MicroAlgos) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let account = state.accounts.entry(address.clone()).or_default();
        account.algos = account.algos.checked_add(amount).unwrap_or(MicroAlgos(u64::MAX));
        debug!("Funded {} with {}", address.short(), amount);
    }

    pub fn algo_balance(&self, address: &Address) -> MicroAlgos {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .accounts
            .get(address)
            .map(|a| a.algos)
            .unwrap_or_default()
    }

    /// ANJ held, or None when the account has not opted in.
    pub fn token_holding(&self, address: &Address) -> Option<u64> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.accounts.get(address).and_then(|a| a.tokens)
    }

    pub fn round(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).round
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn decode(&self, payload: &[u8]) -> Result<Transaction, LedgerError> {
        let signed: SignedTransaction = serde_json::from_slice(payload)?;
        if signed.signer != signed.txn.sender {
            return Err(LedgerError::Rejected("signer does not match sender".to_string()));
        }
        if signed.sig != signature_digest(&signed.signer, &signed.txn.encode()?) {
            return Err(LedgerError::Rejected("invalid signature".to_string()));
        }
        Ok(signed.txn)
    }

    fn check_group(txns: &[Transaction]) -> Result<(), LedgerError> {
        if txns.len() == 1 && txns[0].group.is_none() {
            return Ok(());
        }
        let claimed = txns[0].group;
        if claimed.is_none() || txns.iter().any(|t| t.group != claimed) {
            return Err(LedgerError::Rejected(
                "transactions submitted together must share one group id".to_string(),
            ));
        }
        let mut regrouped = txns.to_vec();
        if Some(assign_group(&mut regrouped)?) != claimed {
            return Err(LedgerError::Rejected("incomplete or reordered group".to_string()));
        }
        Ok(())
    }

    fn check_header(&self, txn: &Transaction, round: u64) -> Result<(), LedgerError> {
        if txn.genesis_id != self.genesis_id {
            return Err(LedgerError::Rejected(format!(
                "wrong network: {}",
                txn.genesis_id
            )));
        }
        if txn.fee < MIN_FEE {
            return Err(LedgerError::Rejected(format!("fee below minimum {}", MIN_FEE)));
        }
        if round < txn.first_valid || round > txn.last_valid {
            return Err(LedgerError::Rejected(format!(
                "round {} outside validity window {}..={}",
                round, txn.first_valid, txn.last_valid
            )));
        }
        Ok(())
    }

    /// Applies one group member and returns the inner transfers it caused.
    fn apply(
        &self,
        accounts: &mut HashMap<Address, AccountState>,
        group: &[Transaction],
        index: usize,
    ) -> Result<Vec<InnerTransfer>, LedgerError> {
        let txn = &group[index];
        debit(accounts, &txn.sender, txn.fee)?;

        match &txn.kind {
            TxnKind::Payment { receiver, amount } => {
                debit(accounts, &txn.sender, *amount)?;
                let to = accounts.entry(receiver.clone()).or_default();
                to.algos = to
                    .algos
                    .checked_add(*amount)
                    .ok_or_else(|| LedgerError::Rejected("balance overflow".to_string()))?;
            }
            TxnKind::AssetTransfer {
                receiver,
                asset_id,
                amount,
            } => {
                if *asset_id != self.asset_id {
                    return Err(LedgerError::Rejected(format!("unknown asset {}", asset_id)));
                }
                if *amount == 0 && receiver == &txn.sender {
                    let account = accounts.entry(txn.sender.clone()).or_default();
                    if account.tokens.is_some() {
                        return Err(LedgerError::Rejected("already opted in".to_string()));
                    }
                    account.tokens = Some(0);
                } else {
                    move_tokens(accounts, &txn.sender, receiver, *amount)?;
                }
            }
            TxnKind::AppCall {
                app_id,
                on_complete,
                args,
                foreign_assets,
            } => {
                if *app_id != self.app_id {
                    return Err(LedgerError::Rejected(format!("unknown application {}", app_id)));
                }
                if *on_complete != OnComplete::NoOp {
                    return Err(LedgerError::Rejected("unsupported on-complete".to_string()));
                }
                let selector = args.first().map(Vec::as_slice);
                if selector != Some(&abi_selector("donate()void")[..]) {
                    return Err(LedgerError::Rejected("unknown method selector".to_string()));
                }
                let returned = self.donate(accounts, group, index, foreign_assets)?;
                return Ok(vec![returned]);
            }
        }
        Ok(Vec::new())
    }

    // donate(): looks for the payment to the app earlier in the group and sends
    // back one ANJ per 0.1 ALGO.
    fn donate(
        &self,
        accounts: &mut HashMap<Address, AccountState>,
        group: &[Transaction],
        index: usize,
        foreign_assets: &[u64],
    ) -> Result<InnerTransfer, LedgerError> {
        let donor = &group[index].sender;
        let paid = group[..index]
            .iter()
            .filter(|t| &t.sender == donor)
            .find_map(|t| match &t.kind {
                TxnKind::Payment { receiver, amount } if receiver == &self.app_address => {
                    Some(*amount)
                }
                _ => None,
            })
            .ok_or_else(|| LedgerError::Rejected("payment must be to app address".to_string()))?;

        let tokens = paid.0 / MICROALGOS_PER_TOKEN;
        if tokens == 0 {
            return Err(LedgerError::Rejected("donation too small for any ANJ".to_string()));
        }
        if !foreign_assets.contains(&self.asset_id) {
            return Err(LedgerError::Rejected(
                "token not referenced by the application call".to_string(),
            ));
        }
        let app_address = self.app_address.clone();
        move_tokens(accounts, &app_address, donor, tokens)?;
        Ok(InnerTransfer {
            receiver: donor.clone(),
            asset_id: self.asset_id,
            amount: tokens,
        })
    }
}

fn debit(
    accounts: &mut HashMap<Address, AccountState>,
    who: &Address,
    amount: MicroAlgos,
) -> Result<(), LedgerError> {
    let account = accounts.entry(who.clone()).or_default();
    account.algos = account.algos.checked_sub(amount).ok_or_else(|| {
        LedgerError::Rejected(format!("overspend: {} has {}", who.short(), account.algos))
    })?;
    Ok(())
}

fn move_tokens(
    accounts: &mut HashMap<Address, AccountState>,
    from: &Address,
    to: &Address,
    amount: u64,
) -> Result<(), LedgerError> {
    let receiver_opted_in = accounts.get(to).is_some_and(|a| a.tokens.is_some());
    if !receiver_opted_in {
        return Err(LedgerError::Rejected(format!(
            "{} has not opted in to the token",
            to.short()
        )));
    }
    let sender = accounts.entry(from.clone()).or_default();
    let held = sender.tokens.unwrap_or(0);
    sender.tokens = Some(held.checked_sub(amount).ok_or_else(|| {
        LedgerError::Rejected(format!("insufficient tokens: {} held, {} needed", held, amount))
    })?);
    if let Some(tokens) = accounts.get_mut(to).and_then(|a| a.tokens.as_mut()) {
        *tokens += amount;
    }
    Ok(())
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError> {
        let round = self.round();
        Ok(SuggestedParams {
            fee: MIN_FEE,
            first_valid: round,
            last_valid: round + VALIDITY_WINDOW,
            genesis_id: self.genesis_id.clone(),
        })
    }

    async fn submit_raw(&self, signed: Vec<Vec<u8>>) -> Result<TxId, LedgerError> {
        if signed.is_empty() {
            return Err(LedgerError::EmptySubmission);
        }
        let txns = signed
            .iter()
            .map(|payload| self.decode(payload))
            .collect::<Result<Vec<_>, _>>()?;
        Self::check_group(&txns)?;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let round = state.round;
        let mut scratch = state.accounts.clone();
        let mut inner = Vec::with_capacity(txns.len());
        for (index, txn) in txns.iter().enumerate() {
            self.check_header(txn, round)?;
            match self.apply(&mut scratch, &txns, index) {
                Ok(transfers) => inner.push(transfers),
                Err(e) => {
                    warn!("Rejected transaction {} of {}: {}", index + 1, txns.len(), e);
                    return Err(e);
                }
            }
        }

        state.accounts = scratch;
        state.round += 1;
        drop(state);

        let now = Utc::now();
        let mut ids = Vec::with_capacity(txns.len());
        for txn in &txns {
            ids.push(txn.id()?);
        }
        let mut confirmed = self.confirmed.lock().unwrap_or_else(|e| e.into_inner());
        for (txid, inner_transfers) in ids.iter().zip(inner) {
            confirmed.insert(
                txid.clone(),
                Confirmation {
                    txid: txid.clone(),
                    round,
                    confirmed_at: now,
                    inner_transfers,
                },
            );
        }
        info!("Committed {} transaction(s) in round {}", ids.len(), round);
        Ok(ids.swap_remove(0))
    }

    async fn wait_for_confirmation(
        &self,
        txid: &TxId,
        max_rounds: u64,
    ) -> Result<Confirmation, LedgerError> {
        // Commits are synchronous here, so a transaction is either already in
        // a block or never will be.
        let confirmed = self.confirmed.lock().unwrap_or_else(|e| e.into_inner());
        confirmed
            .get(txid)
            .cloned()
            .ok_or_else(|| LedgerError::NotConfirmed {
                txid: txid.to_string(),
                rounds: max_rounds,
            })
    }
}
