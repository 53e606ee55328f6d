//! Core value types shared by the origin ledger, the wire codec and the mirror.

use std::fmt;

pub use alloy_primitives::Address;
use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize, Serializer};

/// Endpoint identifier of a chain on the messaging layer.
pub type ChannelId = u32;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Protocol helpers on top of [`Address`].
pub trait AddressExt {
    /// Derive a deterministic address from an arbitrary label.
    ///
    /// Takes the low 20 bytes of `keccak256(label)`, the same truncation the
    /// EVM applies to contract creation hashes.
    fn derive(label: &[u8]) -> Address;

    /// Left-pad to a 32-byte peer identity.
    fn to_peer(&self) -> PeerId;
}

impl AddressExt for Address {
    fn derive(label: &[u8]) -> Address {
        Address::from_word(keccak256(label))
    }

    fn to_peer(&self) -> PeerId {
        PeerId(self.into_word().0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PEER IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// 32-byte remote identity as carried by the messaging layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Recover the address when the identity is a left-padded 20-byte address.
    pub fn to_address(&self) -> Option<Address> {
        if self.0[..12].iter().any(|b| *b != 0) {
            return None;
        }
        Some(Address::from_slice(&self.0[12..]))
    }
}

impl From<Address> for PeerId {
    fn from(address: Address) -> Self {
        address.to_peer()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self)
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Locked principal and its week-aligned unlock timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockedBalance {
    pub amount: u128,
    pub end: u64,
}

impl LockedBalance {
    pub const EMPTY: LockedBalance = LockedBalance { amount: 0, end: 0 };

    pub fn new(amount: u128, end: u64) -> Self {
        Self { amount, end }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.end
    }
}

/// Messaging protocol generation an endpoint application speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Peers configured with packed trusted-remote paths.
    V1,
    /// Peers configured as 32-byte identities per endpoint id.
    V2,
}

/// Origin of a lock position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CakePoolType {
    #[default]
    None = 0,
    /// Migrated from the legacy share-based pool.
    Migrated = 1,
}

/// Whether a migrated pool position has been paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum WithdrawFlag {
    #[default]
    NotWithdrawn = 0,
    Withdrawn = 1,
}

/// Full per-account view of the origin ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UserInfo {
    /// Native lock amount.
    pub amount: u128,
    /// Native lock end (week aligned).
    pub end: u64,
    /// Sub-account holding the migrated position, zero when not migrated.
    pub cake_pool_proxy: Address,
    /// Principal carried over from the legacy pool.
    pub cake_amount: u128,
    /// Legacy pool lock end, as recorded by the pool (not week aligned).
    pub lock_end_time: u64,
    pub migration_time: u64,
    pub cake_pool_type: CakePoolType,
    pub withdraw_flag: WithdrawFlag,
}

impl UserInfo {
    pub fn is_migrated(&self) -> bool {
        self.cake_pool_type == CakePoolType::Migrated
    }

    /// The pool proxy whose lock still counts toward this account's balance.
    pub fn live_proxy(&self) -> Option<Address> {
        if self.is_migrated() && self.withdraw_flag == WithdrawFlag::NotWithdrawn {
            Some(self.cake_pool_proxy)
        } else {
            None
        }
    }
}
