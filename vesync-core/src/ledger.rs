//! Origin-chain lock ledger.
//!
//! Holds each account's native lock, the pool-proxy locks created by
//! migrating legacy pool positions, and the custody book for locked
//! principal. Every operation validates in full before it mutates.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::curve::{self, MAX_LOCK, WEEK};
use crate::error::SyncError;
use crate::legacy_pool::{mul_div, LegacyPool};
use crate::token::TokenBalances;
use crate::types::{Address, AddressExt, CakePoolType, LockedBalance, UserInfo, WithdrawFlag};

/// Migration bookkeeping for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct Migration {
    proxy: Address,
    cake_amount: u128,
    lock_end_time: u64,
    migration_time: u64,
    withdraw_flag: WithdrawFlag,
}

/// Amounts paid out by [`LockLedger::withdraw_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Withdrawal {
    pub native: u128,
    pub migrated: u128,
}

impl Withdrawal {
    pub fn total(&self) -> u128 {
        self.native + self.migrated
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LockLedger {
    address: Address,
    token: TokenBalances,
    locks: HashMap<Address, LockedBalance>,
    migrations: HashMap<Address, Migration>,
    proxy_owners: HashMap<Address, Address>,
    total_locked: u128,
}

impl LockLedger {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            token: TokenBalances::new(),
            locks: HashMap::new(),
            migrations: HashMap::new(),
            proxy_owners: HashMap::new(),
            total_locked: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> &TokenBalances {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut TokenBalances {
        &mut self.token
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NATIVE LOCKS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn create_lock(
        &mut self,
        caller: &Address,
        amount: u128,
        unlock_time: u64,
        now: u64,
    ) -> Result<LockedBalance, SyncError> {
        if !self.locks(caller).is_empty() {
            return Err(SyncError::LockExists);
        }
        if amount == 0 {
            return Err(SyncError::ZeroAmount);
        }
        let end = curve::week_floor(unlock_time);
        if unlock_time < now.saturating_add(WEEK) || end <= now {
            return Err(SyncError::UnlockTimeTooSoon { unlock_time, now });
        }
        let limit = now.saturating_add(MAX_LOCK);
        if unlock_time > limit {
            return Err(SyncError::UnlockTimeTooLate { unlock_time, limit });
        }
        let total_locked = self
            .total_locked
            .checked_add(amount)
            .ok_or(SyncError::Overflow("create_lock"))?;

        self.token.transfer(caller, &self.address, amount)?;
        let lock = LockedBalance::new(amount, end);
        self.locks.insert(*caller, lock);
        self.total_locked = total_locked;

        debug!(account = %caller, amount, end, "lock created");
        Ok(lock)
    }

    pub fn increase_lock_amount(
        &mut self,
        caller: &Address,
        delta: u128,
        now: u64,
    ) -> Result<LockedBalance, SyncError> {
        if delta == 0 {
            return Err(SyncError::ZeroAmount);
        }
        let current = self.active_lock(caller, now)?;
        let amount = current
            .amount
            .checked_add(delta)
            .ok_or(SyncError::Overflow("increase_lock_amount"))?;
        let total_locked = self
            .total_locked
            .checked_add(delta)
            .ok_or(SyncError::Overflow("increase_lock_amount"))?;

        self.token.transfer(caller, &self.address, delta)?;
        let lock = LockedBalance::new(amount, current.end);
        self.locks.insert(*caller, lock);
        self.total_locked = total_locked;

        debug!(account = %caller, delta, amount, "lock amount increased");
        Ok(lock)
    }

    pub fn increase_unlock_time(
        &mut self,
        caller: &Address,
        new_unlock_time: u64,
        now: u64,
    ) -> Result<LockedBalance, SyncError> {
        let current = self.active_lock(caller, now)?;
        let new_end = curve::week_floor(new_unlock_time);
        if new_end <= current.end {
            return Err(SyncError::UnlockTimeNotIncreased {
                new_end,
                current_end: current.end,
            });
        }
        let limit = now.saturating_add(MAX_LOCK);
        if new_unlock_time > limit {
            return Err(SyncError::UnlockTimeTooLate {
                unlock_time: new_unlock_time,
                limit,
            });
        }

        let lock = LockedBalance::new(current.amount, new_end);
        self.locks.insert(*caller, lock);

        debug!(account = %caller, end = new_end, "unlock time increased");
        Ok(lock)
    }

    /// Withdraw every expired lock the caller controls to `recipient`.
    ///
    /// The native lock must be expired if it exists. A migrated pool
    /// position is redeemed once its proxy lock has expired and is otherwise
    /// left running.
    pub fn withdraw_all(
        &mut self,
        caller: &Address,
        recipient: &Address,
        pool: &mut dyn LegacyPool,
        now: u64,
    ) -> Result<Withdrawal, SyncError> {
        let native = self.locks(caller);
        if !native.is_empty() && !native.is_expired(now) {
            return Err(SyncError::LockNotExpired);
        }

        let live_migration = self
            .migrations
            .get(caller)
            .copied()
            .filter(|m| m.withdraw_flag == WithdrawFlag::NotWithdrawn);
        let (release, proxy_running) = match live_migration {
            Some(m) if self.locks(&m.proxy).is_expired(now) => (Some(m), false),
            Some(_) => (None, true),
            None => (None, false),
        };

        if native.is_empty() && release.is_none() {
            return Err(if proxy_running {
                SyncError::LockNotExpired
            } else {
                SyncError::NoLock
            });
        }

        // Every payout is checked against custody before anything settles
        let pool_payout = match release {
            Some(_) => pool.redeemable(caller)?,
            None => 0,
        };
        let native_payout = native.amount;
        let total_payout = pool_payout
            .checked_add(native_payout)
            .ok_or(SyncError::Overflow("withdraw_all"))?;
        self.token
            .balance_of(recipient)
            .checked_add(total_payout)
            .ok_or(SyncError::Overflow("withdraw_all"))?;
        let pool_address = pool.address();
        if pool_address == self.address {
            self.ensure_funded(&self.address, total_payout)?;
        } else {
            self.ensure_funded(&pool_address, pool_payout)?;
            self.ensure_funded(&self.address, native_payout)?;
        }

        let mut withdrawal = Withdrawal::default();

        if let Some(migration) = release {
            let proxy_lock = self.locks(&migration.proxy);
            let paid = pool.release_migrated(caller)?;
            self.token.transfer(&pool_address, recipient, paid)?;
            self.locks.insert(migration.proxy, LockedBalance::EMPTY);
            self.total_locked = self.total_locked.saturating_sub(proxy_lock.amount);
            if let Some(m) = self.migrations.get_mut(caller) {
                m.withdraw_flag = WithdrawFlag::Withdrawn;
            }
            withdrawal.migrated = paid;
        }

        if !native.is_empty() {
            self.token.transfer(&self.address, recipient, native.amount)?;
            self.locks.insert(*caller, LockedBalance::EMPTY);
            self.total_locked = self.total_locked.saturating_sub(native.amount);
            withdrawal.native = native.amount;
        }

        debug!(
            account = %caller,
            recipient = %recipient,
            native = withdrawal.native,
            migrated = withdrawal.migrated,
            "locks withdrawn"
        );
        Ok(withdrawal)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MIGRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move the caller's locked legacy pool position under a pool proxy.
    ///
    /// The native lock is untouched. The carried-over principal is
    /// `shares * balance / total_shares - boosted_share - 1`.
    pub fn migrate_from_cake_pool(
        &mut self,
        caller: &Address,
        pool: &mut dyn LegacyPool,
        now: u64,
    ) -> Result<UserInfo, SyncError> {
        if self.migrations.contains_key(caller) {
            return Err(SyncError::AlreadyMigrated);
        }
        let info = pool
            .user_info(caller)
            .filter(|info| info.is_migratable())
            .ok_or(SyncError::NoLegacyPosition(*caller))?;
        if info.lock_end_time <= now {
            return Err(SyncError::LegacyLockExpired);
        }

        let total_shares = pool.total_shares();
        if total_shares == 0 {
            return Err(SyncError::NoLegacyPosition(*caller));
        }
        let cake_amount = mul_div(
            info.shares,
            pool.balance_of(),
            total_shares,
            "migrate_from_cake_pool",
        )?;
        let cake_amount = cake_amount
            .checked_sub(info.user_boosted_share)
            .and_then(|v| v.checked_sub(1))
            .ok_or(SyncError::Overflow("migrate_from_cake_pool"))?;
        let total_locked = self
            .total_locked
            .checked_add(cake_amount)
            .ok_or(SyncError::Overflow("migrate_from_cake_pool"))?;

        pool.mark_migrated(caller)?;

        let proxy = self.proxy_address(caller);
        let end = curve::week_floor(info.lock_end_time);
        self.locks.insert(proxy, LockedBalance::new(cake_amount, end));
        self.proxy_owners.insert(proxy, *caller);
        self.migrations.insert(
            *caller,
            Migration {
                proxy,
                cake_amount,
                lock_end_time: info.lock_end_time,
                migration_time: now,
                withdraw_flag: WithdrawFlag::NotWithdrawn,
            },
        );
        self.total_locked = total_locked;

        debug!(account = %caller, proxy = %proxy, cake_amount, end, "migrated from cake pool");
        Ok(self.get_user_info(caller))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // READS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn locks(&self, account: &Address) -> LockedBalance {
        self.locks.get(account).copied().unwrap_or_default()
    }

    pub fn get_user_info(&self, account: &Address) -> UserInfo {
        let native = self.locks(account);
        let mut info = UserInfo {
            amount: native.amount,
            end: native.end,
            ..UserInfo::default()
        };
        if let Some(m) = self.migrations.get(account) {
            info.cake_pool_proxy = m.proxy;
            info.cake_amount = m.cake_amount;
            info.lock_end_time = m.lock_end_time;
            info.migration_time = m.migration_time;
            info.cake_pool_type = CakePoolType::Migrated;
            info.withdraw_flag = m.withdraw_flag;
        }
        info
    }

    /// Voting power of `account` at `t`: native lock plus live proxy lock.
    pub fn balance_of(&self, account: &Address, t: u64) -> u128 {
        let native = curve::voting_power(&self.locks(account), t);
        let proxy = self
            .get_user_info(account)
            .live_proxy()
            .map(|proxy| curve::voting_power(&self.locks(&proxy), t))
            .unwrap_or(0);
        native.saturating_add(proxy)
    }

    /// Principal held in native and proxy locks.
    pub fn total_locked(&self) -> u128 {
        self.total_locked
    }

    pub fn proxy_owner(&self, proxy: &Address) -> Option<Address> {
        self.proxy_owners.get(proxy).copied()
    }

    fn proxy_address(&self, user: &Address) -> Address {
        let mut label = Vec::with_capacity(20 + 15 + 20);
        label.extend_from_slice(self.address.as_slice());
        label.extend_from_slice(b"cake-pool-proxy");
        label.extend_from_slice(user.as_slice());
        Address::derive(&label)
    }

    fn ensure_funded(&self, holder: &Address, required: u128) -> Result<(), SyncError> {
        let available = self.token.balance_of(holder);
        if available < required {
            return Err(SyncError::InsufficientBalance { required, available });
        }
        Ok(())
    }

    fn active_lock(&self, account: &Address, now: u64) -> Result<LockedBalance, SyncError> {
        let lock = self.locks(account);
        if lock.is_empty() {
            return Err(SyncError::NoLock);
        }
        if lock.is_expired(now) {
            return Err(SyncError::LockExpired);
        }
        Ok(lock)
    }
}
