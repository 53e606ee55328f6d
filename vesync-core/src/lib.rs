//! vesync-core
//!
//! Cross-chain synchronization of voting-escrow lock balances. An origin
//! chain keeps the authoritative lock ledger; a sender snapshots one
//! account's lock state into a fixed ABI payload; a transport carries it to a
//! destination chain, where a receiver authenticates it and upserts the
//! account's record into a mirror ledger. Both ledgers evaluate balances with
//! the same curve, so they agree at any shared timestamp once a sync lands.

pub mod chains;
pub mod curve;
pub mod encoding;
pub mod error;
pub mod ledger;
pub mod legacy_pool;
pub mod mirror;
pub mod network;
pub mod peers;
pub mod profile;
pub mod receiver;
pub mod sender;
pub mod token;
pub mod transport;
pub mod types;

pub use encoding::SyncPayload;
pub use error::{ErrorKind, SyncError};
pub use ledger::{LockLedger, Withdrawal};
pub use legacy_pool::{InMemoryCakePool, LegacyPool, LegacyUserInfo};
pub use mirror::{MirrorLedger, MirrorUpdate, SyncStatus};
pub use network::{DeliveryOutcome, Deployment, NetworkSetup, RelayReport, SyncNetwork};
pub use profile::{InMemoryProfileRegistry, ProfileMirror, ProfileRegistry};
pub use receiver::{Delivery, DispatchPlan, SyncReceiver};
pub use sender::{SendContext, SyncRequest, SyncSender};
pub use transport::{EndpointConfig, LocalTransport, MessageReceipt, Packet, Transport};
pub use types::{
    Address, AddressExt, CakePoolType, ChannelId, LockedBalance, PeerId, ProtocolVersion, UserInfo,
    WithdrawFlag,
};

/// Rail identifier for the veToken sync service
pub const RAIL_ID_VESYNC: &str = "VESYNC_LAYERZERO";
