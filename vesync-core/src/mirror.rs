//! Destination-chain mirror of the lock ledger.
//!
//! Records are written only through [`MirrorLedger::sync`] by the bound
//! receiver. Balances are evaluated with the same curve as the origin.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::curve;
use crate::error::SyncError;
use crate::types::{Address, LockedBalance};

/// Lock state carried by one delivered sync message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorUpdate {
    pub account: Address,
    pub lock: LockedBalance,
    /// Live pool proxy and its lock, if the account has one.
    pub proxy: Option<(Address, LockedBalance)>,
    pub synced_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Unsynced,
    Synced {
        lock: LockedBalance,
        cake_pool_proxy: Option<Address>,
        proxy_lock: LockedBalance,
        synced_at: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MirrorLedger {
    address: Address,
    owner: Address,
    receiver: Address,
    records: HashMap<Address, LockedBalance>,
    proxies: HashMap<Address, Address>,
    synced_at: HashMap<Address, u64>,
}

impl MirrorLedger {
    pub fn new(address: Address, owner: Address, receiver: Address) -> Self {
        Self {
            address,
            owner,
            receiver,
            records: HashMap::new(),
            proxies: HashMap::new(),
            synced_at: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn receiver(&self) -> Address {
        self.receiver
    }

    pub fn update_receiver(&mut self, caller: &Address, receiver: Address) -> Result<(), SyncError> {
        if *caller != self.owner {
            return Err(SyncError::Unauthorized("caller is not the owner".into()));
        }
        debug!(mirror = %self.address, old = %self.receiver, new = %receiver, "receiver updated");
        self.receiver = receiver;
        Ok(())
    }

    pub fn ensure_receiver(&self, caller: &Address) -> Result<(), SyncError> {
        if *caller != self.receiver {
            return Err(SyncError::Unauthorized(format!(
                "{} is not the receiver of mirror {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    /// Upsert an account's record. Applying the same update twice leaves the
    /// same state as applying it once.
    pub fn sync(&mut self, caller: &Address, update: &MirrorUpdate) -> Result<(), SyncError> {
        self.ensure_receiver(caller)?;

        self.records.insert(update.account, update.lock);
        let previous = self.proxies.get(&update.account).copied();
        match update.proxy {
            Some((proxy, proxy_lock)) => {
                if let Some(old) = previous.filter(|old| *old != proxy) {
                    self.records.insert(old, LockedBalance::EMPTY);
                }
                self.proxies.insert(update.account, proxy);
                self.records.insert(proxy, proxy_lock);
            }
            None => {
                if let Some(old) = previous {
                    self.records.insert(old, LockedBalance::EMPTY);
                    self.proxies.remove(&update.account);
                }
            }
        }
        self.synced_at.insert(update.account, update.synced_at);

        debug!(
            mirror = %self.address,
            account = %update.account,
            amount = update.lock.amount,
            end = update.lock.end,
            "lock mirrored"
        );
        Ok(())
    }

    pub fn locks(&self, account: &Address) -> LockedBalance {
        self.records.get(account).copied().unwrap_or_default()
    }

    pub fn cake_pool_proxy(&self, account: &Address) -> Option<Address> {
        self.proxies.get(account).copied()
    }

    /// Voting power of `account` at `t`, including a linked pool proxy.
    pub fn balance_of(&self, account: &Address, t: u64) -> u128 {
        let native = curve::voting_power(&self.locks(account), t);
        let proxy = self
            .cake_pool_proxy(account)
            .map(|proxy| curve::voting_power(&self.locks(&proxy), t))
            .unwrap_or(0);
        native.saturating_add(proxy)
    }

    pub fn sync_status(&self, account: &Address) -> SyncStatus {
        match self.synced_at.get(account) {
            None => SyncStatus::Unsynced,
            Some(synced_at) => {
                let proxy = self.cake_pool_proxy(account);
                SyncStatus::Synced {
                    lock: self.locks(account),
                    cake_pool_proxy: proxy,
                    proxy_lock: proxy.map(|p| self.locks(&p)).unwrap_or_default(),
                    synced_at: *synced_at,
                }
            }
        }
    }
}
