use crate::models::TokenAmount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid {expected}: {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("not a plain decimal amount: {0:?}")]
    Malformed(String),
    #[error("amount too large: {0}")]
    Overflow(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 58 characters, got {0}")]
    Length(usize),
    #[error("address contains characters outside the base32 alphabet")]
    Alphabet,
    #[error("address checksum mismatch")]
    Checksum,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet account is connected")]
    NotConnected,
    #[error("unknown wallet account {0}")]
    UnknownAccount(String),
    #[error("signing request rejected: {0}")]
    Rejected(String),
    #[error("failed to encode transaction: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("malformed signed transaction: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("transaction {txid} not confirmed after {rounds} rounds")]
    NotConfirmed { txid: String, rounds: u64 },
    #[error("nothing to submit")]
    EmptySubmission,
}

#[derive(Debug, Error)]
pub enum DonationError {
    #[error("Please connect your wallet first.")]
    NotConnected,
    #[error("Please enter a valid donation amount.")]
    InvalidAmount,
    #[error("A transaction is already being processed.")]
    Busy,
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("confirmed, but the session credit could not be updated: {0}")]
    Credit(#[from] AmountError),
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("vote settlement failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Please connect your wallet first.")]
    NotConnected,
    #[error("no poll with id {0}")]
    UnknownPoll(u32),
    #[error("poll {poll_id} has no option {option:?}")]
    UnknownOption { poll_id: u32, option: String },
    #[error("Please select an option first.")]
    NoSelection,
    #[error("Insufficient balance: {balance} available, {cost} required.")]
    InsufficientBalance {
        balance: TokenAmount,
        cost: TokenAmount,
    },
    #[error("A vote for this poll is already being cast.")]
    AlreadySubmitting,
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}
