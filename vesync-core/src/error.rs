//! Error types for the lock ledger, the sync messaging path and the mirror.

use thiserror::Error;

use crate::types::{Address, ChannelId, PeerId};

/// Coarse classification of a [`SyncError`], used by callers that map
/// failures onto transport-level status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lock state does not allow the operation.
    Precondition,
    /// Caller or message origin is not allowed to perform the operation.
    Authorization,
    /// Sender is administratively paused.
    Paused,
    /// Fee supplied with a send is below the quote.
    Underpayment,
    /// Channel, endpoint or routing problem.
    Transport,
    /// Payload could not be encoded or decoded.
    Codec,
}

#[derive(Debug, Error)]
pub enum SyncError {
    // ── lock preconditions ──────────────────────────────────────────────────
    #[error("Lock exists")]
    LockExists,

    #[error("No lock found")]
    NoLock,

    #[error("Lock expired")]
    LockExpired,

    #[error("Lock not expired")]
    LockNotExpired,

    #[error("Bad amount")]
    ZeroAmount,

    #[error("_unlockTime too old: unlock_time={unlock_time}, now={now}")]
    UnlockTimeTooSoon { unlock_time: u64, now: u64 },

    #[error("Cannot lock more than max lock: unlock_time={unlock_time}, limit={limit}")]
    UnlockTimeTooLate { unlock_time: u64, limit: u64 },

    #[error("Lock time not increased: new_end={new_end}, current_end={current_end}")]
    UnlockTimeNotIncreased { new_end: u64, current_end: u64 },

    #[error("insufficient balance: required={required}, available={available}")]
    InsufficientBalance { required: u128, available: u128 },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    // ── migration ───────────────────────────────────────────────────────────
    #[error("Already migrated")]
    AlreadyMigrated,

    #[error("No legacy pool position for {0}")]
    NoLegacyPosition(Address),

    #[error("Legacy lock expired")]
    LegacyLockExpired,

    // ── authorization / admin ───────────────────────────────────────────────
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("Pausable: paused")]
    Paused,

    #[error("untrusted source: channel={channel}, sender={sender}")]
    UntrustedSource { channel: ChannelId, sender: PeerId },

    #[error("proxy contract not set")]
    ProxyNotSet,

    #[error("invalid trusted remote path: {0}")]
    InvalidTrustedRemote(String),

    // ── sending ─────────────────────────────────────────────────────────────
    #[error("nothing to sync")]
    NothingToSync,

    #[error("peer not set for channel {0}")]
    PeerNotSet(ChannelId),

    #[error("insufficient fee: required={required}, paid={paid}")]
    Underpaid { required: u128, paid: u128 },

    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("contract not deployed: {0}")]
    NotDeployed(Address),

    // ── codec ───────────────────────────────────────────────────────────────
    #[error("decoding error: {0}")]
    Decoding(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::LockExists
            | SyncError::NoLock
            | SyncError::LockExpired
            | SyncError::LockNotExpired
            | SyncError::ZeroAmount
            | SyncError::UnlockTimeTooSoon { .. }
            | SyncError::UnlockTimeTooLate { .. }
            | SyncError::UnlockTimeNotIncreased { .. }
            | SyncError::InsufficientBalance { .. }
            | SyncError::Overflow(_)
            | SyncError::NoLegacyPosition(_)
            | SyncError::LegacyLockExpired
            | SyncError::NothingToSync => ErrorKind::Precondition,
            SyncError::AlreadyMigrated
            | SyncError::Unauthorized(_)
            | SyncError::UntrustedSource { .. } => ErrorKind::Authorization,
            SyncError::Paused => ErrorKind::Paused,
            SyncError::Underpaid { .. } => ErrorKind::Underpayment,
            SyncError::ProxyNotSet
            | SyncError::InvalidTrustedRemote(_)
            | SyncError::PeerNotSet(_)
            | SyncError::UnknownChannel(_)
            | SyncError::MessageTooLarge { .. }
            | SyncError::NotDeployed(_) => ErrorKind::Transport,
            SyncError::Decoding(_) => ErrorKind::Codec,
        }
    }

    /// Short machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::LockExists => "LOCK_EXISTS",
            SyncError::NoLock => "NO_LOCK",
            SyncError::LockExpired => "LOCK_EXPIRED",
            SyncError::LockNotExpired => "LOCK_NOT_EXPIRED",
            SyncError::ZeroAmount => "BAD_AMOUNT",
            SyncError::UnlockTimeTooSoon { .. } => "UNLOCK_TIME_TOO_SOON",
            SyncError::UnlockTimeTooLate { .. } => "UNLOCK_TIME_TOO_LATE",
            SyncError::UnlockTimeNotIncreased { .. } => "UNLOCK_TIME_NOT_INCREASED",
            SyncError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            SyncError::Overflow(_) => "OVERFLOW",
            SyncError::AlreadyMigrated => "ALREADY_MIGRATED",
            SyncError::NoLegacyPosition(_) => "NO_LEGACY_POSITION",
            SyncError::LegacyLockExpired => "LEGACY_LOCK_EXPIRED",
            SyncError::Unauthorized(_) => "UNAUTHORIZED",
            SyncError::Paused => "PAUSED",
            SyncError::UntrustedSource { .. } => "UNTRUSTED_SOURCE",
            SyncError::ProxyNotSet => "PROXY_NOT_SET",
            SyncError::InvalidTrustedRemote(_) => "INVALID_TRUSTED_REMOTE",
            SyncError::NothingToSync => "NOTHING_TO_SYNC",
            SyncError::PeerNotSet(_) => "PEER_NOT_SET",
            SyncError::Underpaid { .. } => "UNDERPAID",
            SyncError::UnknownChannel(_) => "UNKNOWN_CHANNEL",
            SyncError::MessageTooLarge { .. } => "MESSAGE_TOO_LARGE",
            SyncError::NotDeployed(_) => "NOT_DEPLOYED",
            SyncError::Decoding(_) => "DECODING_ERROR",
        }
    }
}
