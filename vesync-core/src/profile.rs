//! Profile activity flag on the origin chain and its destination mirror.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::SyncError;
use crate::types::Address;

/// Read interface the sender uses to snapshot a profile flag.
pub trait ProfileRegistry {
    fn is_active(&self, account: &Address) -> bool;
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct InMemoryProfileRegistry {
    active: HashMap<Address, bool>,
}

impl InMemoryProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_profile(&mut self, account: &Address) {
        self.active.insert(*account, true);
    }

    pub fn pause_profile(&mut self, account: &Address) -> Result<(), SyncError> {
        self.set_active(account, false)
    }

    pub fn reactivate_profile(&mut self, account: &Address) -> Result<(), SyncError> {
        self.set_active(account, true)
    }

    fn set_active(&mut self, account: &Address, active: bool) -> Result<(), SyncError> {
        let flag = self
            .active
            .get_mut(account)
            .ok_or_else(|| SyncError::Unauthorized(format!("{} has no profile", account)))?;
        *flag = active;
        Ok(())
    }
}

impl ProfileRegistry for InMemoryProfileRegistry {
    fn is_active(&self, account: &Address) -> bool {
        self.active.get(account).copied().unwrap_or(false)
    }
}

/// Destination-side copy of the profile flag, written only by its receiver.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileMirror {
    address: Address,
    owner: Address,
    receiver: Address,
    active: HashMap<Address, bool>,
}

impl ProfileMirror {
    pub fn new(address: Address, owner: Address, receiver: Address) -> Self {
        Self {
            address,
            owner,
            receiver,
            active: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn receiver(&self) -> Address {
        self.receiver
    }

    pub fn is_active(&self, account: &Address) -> bool {
        self.active.get(account).copied().unwrap_or(false)
    }

    pub fn ensure_receiver(&self, caller: &Address) -> Result<(), SyncError> {
        if *caller != self.receiver {
            return Err(SyncError::Unauthorized(format!(
                "{} is not the receiver of profile mirror {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    pub fn sync(&mut self, caller: &Address, account: &Address, active: bool) -> Result<(), SyncError> {
        self.ensure_receiver(caller)?;
        self.active.insert(*account, active);
        debug!(account = %account, active, "profile flag mirrored");
        Ok(())
    }

    pub fn update_receiver(&mut self, caller: &Address, receiver: Address) -> Result<(), SyncError> {
        if *caller != self.owner {
            return Err(SyncError::Unauthorized("caller is not the owner".into()));
        }
        self.receiver = receiver;
        Ok(())
    }
}
