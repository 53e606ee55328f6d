//! Share-based legacy staking pool that positions are migrated out of.

use std::collections::HashMap;

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::SyncError;
use crate::types::Address;

/// `a * b / denominator` through a 256-bit intermediate product.
pub fn mul_div(a: u128, b: u128, denominator: u128, op: &'static str) -> Result<u128, SyncError> {
    if denominator == 0 {
        return Err(SyncError::Overflow(op));
    }
    let value = U256::from(a) * U256::from(b) / U256::from(denominator);
    u128::try_from(value).map_err(|_| SyncError::Overflow(op))
}

/// A user's position in the legacy pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LegacyUserInfo {
    pub shares: u128,
    /// Boost shares that are not redeemable as principal.
    pub user_boosted_share: u128,
    pub locked: bool,
    pub lock_end_time: u64,
    pub migrated: bool,
}

impl LegacyUserInfo {
    /// Whether the position can be migrated into the lock ledger.
    pub fn is_migratable(&self) -> bool {
        self.locked && self.shares > 0 && !self.migrated
    }
}

/// Read and settlement interface the lock ledger needs from the legacy pool.
pub trait LegacyPool {
    /// Account that custodies the pool's principal in the token book.
    fn address(&self) -> Address;

    fn user_info(&self, user: &Address) -> Option<LegacyUserInfo>;

    fn total_shares(&self) -> u128;

    /// Principal held by the pool, including harvested rewards.
    fn balance_of(&self) -> u128;

    /// Hand control of `user`'s position to the lock ledger.
    fn mark_migrated(&mut self, user: &Address) -> Result<(), SyncError>;

    /// Principal [`LegacyPool::release_migrated`] would pay `user`, without
    /// settling anything.
    fn redeemable(&self, user: &Address) -> Result<u128, SyncError>;

    /// Redeem a migrated position, returning the principal paid out.
    fn release_migrated(&mut self, user: &Address) -> Result<u128, SyncError>;
}

/// In-memory pool keeping the `shares * balance / total_shares` accounting.
#[derive(Debug, Clone, Serialize)]
pub struct InMemoryCakePool {
    address: Address,
    users: HashMap<Address, LegacyUserInfo>,
    total_shares: u128,
    balance: u128,
}

impl InMemoryCakePool {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            users: HashMap::new(),
            total_shares: 0,
            balance: 0,
        }
    }

    /// Deposit `amount` as a locked position ending at `lock_end_time`.
    ///
    /// Returns the shares minted. The caller is responsible for moving the
    /// tokens to [`LegacyPool::address`].
    pub fn deposit(
        &mut self,
        user: &Address,
        amount: u128,
        lock_end_time: u64,
        boosted_share: u128,
    ) -> Result<u128, SyncError> {
        if amount == 0 {
            return Err(SyncError::ZeroAmount);
        }
        let shares = if self.total_shares == 0 || self.balance == 0 {
            amount
        } else {
            mul_div(amount, self.total_shares, self.balance, "deposit")?
        };

        let entry = self.users.entry(*user).or_default();
        entry.shares = entry
            .shares
            .checked_add(shares)
            .ok_or(SyncError::Overflow("deposit"))?;
        entry.user_boosted_share = boosted_share;
        entry.locked = true;
        entry.lock_end_time = entry.lock_end_time.max(lock_end_time);

        self.total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(SyncError::Overflow("deposit"))?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(SyncError::Overflow("deposit"))?;
        Ok(shares)
    }

    /// Add rewards to the pool balance without minting shares.
    pub fn harvest(&mut self, reward: u128) -> Result<(), SyncError> {
        self.balance = self
            .balance
            .checked_add(reward)
            .ok_or(SyncError::Overflow("harvest"))?;
        Ok(())
    }

    fn migrated_position(&self, user: &Address) -> Result<LegacyUserInfo, SyncError> {
        self.users
            .get(user)
            .copied()
            .filter(|info| info.migrated && info.shares > 0)
            .ok_or(SyncError::NoLegacyPosition(*user))
    }

    fn current_amount(&self, info: &LegacyUserInfo) -> Result<u128, SyncError> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        let gross = mul_div(info.shares, self.balance, self.total_shares, "pool share value")?;
        Ok(gross.saturating_sub(info.user_boosted_share))
    }
}

impl LegacyPool for InMemoryCakePool {
    fn address(&self) -> Address {
        self.address
    }

    fn user_info(&self, user: &Address) -> Option<LegacyUserInfo> {
        self.users.get(user).copied()
    }

    fn total_shares(&self) -> u128 {
        self.total_shares
    }

    fn balance_of(&self) -> u128 {
        self.balance
    }

    fn mark_migrated(&mut self, user: &Address) -> Result<(), SyncError> {
        let info = self
            .users
            .get_mut(user)
            .filter(|info| info.is_migratable())
            .ok_or(SyncError::NoLegacyPosition(*user))?;
        info.migrated = true;
        Ok(())
    }

    fn redeemable(&self, user: &Address) -> Result<u128, SyncError> {
        let info = self.migrated_position(user)?;
        self.current_amount(&info)
    }

    fn release_migrated(&mut self, user: &Address) -> Result<u128, SyncError> {
        let info = self.migrated_position(user)?;
        let payout = self.current_amount(&info)?;
        self.total_shares -= info.shares;
        self.balance -= payout;
        self.users.insert(
            *user,
            LegacyUserInfo {
                migrated: true,
                ..LegacyUserInfo::default()
            },
        );
        Ok(payout)
    }
}
