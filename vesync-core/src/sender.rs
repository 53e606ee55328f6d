//! Origin-side sync sender.
//!
//! Snapshots an account's lock state from the ledger and hands the encoded
//! payload to the transport. A send never mutates ledger state.

use serde::Serialize;
use tracing::info;

use crate::encoding::{SyncPayload, SYNC_PAYLOAD_LEN};
use crate::error::SyncError;
use crate::ledger::LockLedger;
use crate::peers::PeerTable;
use crate::profile::ProfileRegistry;
use crate::transport::{MessageReceipt, OutboundMessage, Transport};
use crate::types::{Address, ChannelId, LockedBalance, PeerId, ProtocolVersion};

/// Arguments of [`SyncSender::send_sync_msg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub caller: Address,
    pub dst: ChannelId,
    pub account: Address,
    pub sync_lock: bool,
    pub sync_profile: bool,
    pub extra_gas: u128,
}

/// Origin-chain state a send reads from.
pub struct SendContext<'a> {
    pub ledger: &'a LockLedger,
    pub profiles: &'a dyn ProfileRegistry,
    pub transport: &'a mut dyn Transport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSender {
    address: Address,
    owner: Address,
    channel: ChannelId,
    version: ProtocolVersion,
    paused: bool,
    peers: PeerTable,
}

impl SyncSender {
    pub fn new(address: Address, owner: Address, channel: ChannelId, version: ProtocolVersion) -> Self {
        Self {
            address,
            owner,
            channel,
            version,
            paused: false,
            peers: PeerTable::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn pause(&mut self, caller: &Address, paused: bool) -> Result<(), SyncError> {
        self.only_owner(caller)?;
        self.paused = paused;
        info!(sender = %self.address, paused, "sender pause state changed");
        Ok(())
    }

    pub fn set_peer(&mut self, caller: &Address, channel: ChannelId, peer: PeerId) -> Result<(), SyncError> {
        self.only_owner(caller)?;
        self.peers.set_peer(channel, peer);
        info!(sender = %self.address, channel, peer = %peer, "peer set");
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
        info!(sender = %self.address, channel, remote = %remote, "trusted remote set");
        Ok(())
    }

    fn only_owner(&self, caller: &Address) -> Result<(), SyncError> {
        if *caller != self.owner {
            return Err(SyncError::Unauthorized(format!(
                "{} is not the owner of sender {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SENDING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fee a sync message to `dst` with `extra_gas` costs right now.
    pub fn get_estimate_gas_fees(
        &self,
        transport: &dyn Transport,
        dst: ChannelId,
        extra_gas: u128,
    ) -> Result<u128, SyncError> {
        self.peers.require_peer(dst)?;
        transport.quote(dst, SYNC_PAYLOAD_LEN, extra_gas)
    }

    /// Build the payload a send would carry, without sending it.
    pub fn snapshot(
        &self,
        ledger: &LockLedger,
        profiles: &dyn ProfileRegistry,
        request: &SyncRequest,
    ) -> SyncPayload {
        let mut payload = SyncPayload {
            account: request.account,
            sync_lock: request.sync_lock,
            lock: LockedBalance::EMPTY,
            cake_pool_proxy: Address::ZERO,
            proxy_lock: LockedBalance::EMPTY,
            sync_profile: request.sync_profile,
            profile_active: false,
            extra_gas: request.extra_gas,
        };
        if request.sync_lock {
            payload.lock = ledger.locks(&request.account);
            if let Some(proxy) = ledger.get_user_info(&request.account).live_proxy() {
                payload.cake_pool_proxy = proxy;
                payload.proxy_lock = ledger.locks(&proxy);
            }
        }
        if request.sync_profile {
            payload.profile_active = profiles.is_active(&request.account);
        }
        payload
    }

    pub fn send_sync_msg(
        &self,
        ctx: SendContext<'_>,
        request: SyncRequest,
        fee_paid: u128,
    ) -> Result<MessageReceipt, SyncError> {
        if self.paused {
            return Err(SyncError::Paused);
        }
        if !request.sync_lock && !request.sync_profile {
            return Err(SyncError::NothingToSync);
        }
        let receiver = self.peers.require_peer(request.dst)?;

        let payload = self.snapshot(ctx.ledger, ctx.profiles, &request);
        let message = OutboundMessage {
            src_channel: self.channel,
            sender: self.address,
            dst_channel: request.dst,
            receiver,
            payload: payload.encode(),
            extra_gas: request.extra_gas,
        };
        let receipt = ctx.transport.send(message, fee_paid)?;

        info!(
            caller = %request.caller,
            account = %request.account,
            dst = request.dst,
            nonce = receipt.nonce,
            amount = payload.lock.amount,
            end = payload.lock.end,
            "sync message sent"
        );
        Ok(receipt)
    }
}
