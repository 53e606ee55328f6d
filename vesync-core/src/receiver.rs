//! Destination-side receiver.
//!
//! Authenticates inbound packets against the peer table, decodes them and
//! works out which mirrors they update. Application is split into
//! [`SyncReceiver::prepare`] and [`SyncReceiver::commit`] so the destination
//! chain can validate every target before anything is written.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::encoding::SyncPayload;
use crate::error::SyncError;
use crate::peers::PeerTable;
use crate::transport::Origin;
use crate::types::{Address, ChannelId, PeerId, ProtocolVersion};

/// Writes a decoded payload turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub origin: Origin,
    pub payload: SyncPayload,
    /// Lock mirror to update, when the payload carries lock state.
    pub lock_target: Option<Address>,
    /// Profile mirror to update, when the payload carries a profile flag.
    pub profile_target: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Apply(DispatchPlan),
    /// Nonce already applied on this path.
    Duplicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReceiver {
    address: Address,
    owner: Address,
    channel: ChannelId,
    version: ProtocolVersion,
    peers: PeerTable,
    ve_proxy: Option<Address>,
    profile_proxy: Option<Address>,
    #[serde(skip)]
    applied: HashMap<(ChannelId, PeerId), u64>,
}

impl SyncReceiver {
    pub fn new(address: Address, owner: Address, channel: ChannelId, version: ProtocolVersion) -> Self {
        Self {
            address,
            owner,
            channel,
            version,
            peers: PeerTable::new(),
            ve_proxy: None,
            profile_proxy: None,
            applied: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn ve_proxy(&self) -> Option<Address> {
        self.ve_proxy
    }

    pub fn profile_proxy(&self) -> Option<Address> {
        self.profile_proxy
    }

    /// Highest nonce applied from `sender` on `channel`.
    pub fn last_nonce(&self, channel: ChannelId, sender: &PeerId) -> u64 {
        self.applied.get(&(channel, *sender)).copied().unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_peer(&mut self, caller: &Address, channel: ChannelId, peer: PeerId) -> Result<(), SyncError> {
        self.only_owner(caller)?;
        self.peers.set_peer(channel, peer);
        info!(receiver = %self.address, channel, peer = %peer, "peer set");
        Ok(())
    }

    pub fn set_trusted_remote(
        &mut self,
        caller: &Address,
        channel: ChannelId,
        path: &[u8],
    ) -> Result<(), SyncError> {
        self.only_owner(caller)?;
        let remote = self.peers.set_trusted_remote(channel, path, &self.address)?;
        info!(receiver = %self.address, channel, remote = %remote, "trusted remote set");
        Ok(())
    }

    /// Rebind the mirrors decoded updates are dispatched to.
    pub fn update_proxy_contract(
        &mut self,
        caller: &Address,
        ve_proxy: Address,
        profile_proxy: Address,
    ) -> Result<(), SyncError> {
        self.only_owner(caller)?;
        self.ve_proxy = Some(ve_proxy).filter(|a| !a.is_zero());
        self.profile_proxy = Some(profile_proxy).filter(|a| !a.is_zero());
        info!(
            receiver = %self.address,
            ve_proxy = %ve_proxy,
            profile_proxy = %profile_proxy,
            "proxy contracts updated"
        );
        Ok(())
    }

    fn only_owner(&self, caller: &Address) -> Result<(), SyncError> {
        if *caller != self.owner {
            return Err(SyncError::Unauthorized(format!(
                "{} is not the owner of receiver {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INBOUND
    // ═══════════════════════════════════════════════════════════════════════════

    /// Authenticate and decode an inbound packet. Nothing is recorded.
    pub fn prepare(&self, origin: &Origin, payload: &[u8]) -> Result<Delivery, SyncError> {
        if !self.peers.is_trusted(origin.src_channel, &origin.sender) {
            warn!(
                receiver = %self.address,
                channel = origin.src_channel,
                sender = %origin.sender,
                "rejected packet from untrusted source"
            );
            return Err(SyncError::UntrustedSource {
                channel: origin.src_channel,
                sender: origin.sender,
            });
        }

        let payload = SyncPayload::decode(payload)?;

        if origin.nonce <= self.last_nonce(origin.src_channel, &origin.sender) {
            return Ok(Delivery::Duplicate);
        }

        let lock_target = if payload.sync_lock {
            Some(self.ve_proxy.ok_or(SyncError::ProxyNotSet)?)
        } else {
            None
        };
        let profile_target = if payload.sync_profile {
            Some(self.profile_proxy.ok_or(SyncError::ProxyNotSet)?)
        } else {
            None
        };

        Ok(Delivery::Apply(DispatchPlan {
            origin: *origin,
            payload,
            lock_target,
            profile_target,
        }))
    }

    /// Record that the packet at `origin` has been applied.
    pub fn commit(&mut self, origin: &Origin) {
        let last = self
            .applied
            .entry((origin.src_channel, origin.sender))
            .or_insert(0);
        *last = (*last).max(origin.nonce);
    }
}
