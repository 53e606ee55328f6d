//! Two-chain harness wiring the ledger, the transport and the mirrors.
//!
//! The origin chain hosts the lock ledger, the legacy pool, the profile
//! registry and any number of senders. The destination chain hosts
//! receivers and mirrors. Both share one simulated clock; the transport
//! keeps its own block counter for confirmations.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::ledger::{LockLedger, Withdrawal};
use crate::legacy_pool::{InMemoryCakePool, LegacyPool};
use crate::mirror::{MirrorLedger, MirrorUpdate};
use crate::peers::trusted_remote_path;
use crate::profile::{InMemoryProfileRegistry, ProfileMirror};
use crate::receiver::{Delivery, SyncReceiver};
use crate::sender::{SendContext, SyncRequest, SyncSender};
use crate::transport::{EndpointConfig, LocalTransport, MessageReceipt, Packet};
use crate::types::{Address, AddressExt, ChannelId, ProtocolVersion, UserInfo};

// ═══════════════════════════════════════════════════════════════════════════════
// ORIGIN CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct OriginChain {
    pub channel: ChannelId,
    pub ledger: LockLedger,
    pub cake_pool: InMemoryCakePool,
    pub profiles: InMemoryProfileRegistry,
    pub senders: BTreeMap<Address, SyncSender>,
}

impl OriginChain {
    pub fn new(channel: ChannelId, ledger: Address, cake_pool: Address) -> Self {
        Self {
            channel,
            ledger: LockLedger::new(ledger),
            cake_pool: InMemoryCakePool::new(cake_pool),
            profiles: InMemoryProfileRegistry::new(),
            senders: BTreeMap::new(),
        }
    }

    pub fn sender(&self, address: &Address) -> Result<&SyncSender, SyncError> {
        self.senders.get(address).ok_or(SyncError::NotDeployed(*address))
    }

    pub fn sender_mut(&mut self, address: &Address) -> Result<&mut SyncSender, SyncError> {
        self.senders
            .get_mut(address)
            .ok_or(SyncError::NotDeployed(*address))
    }

    /// Give `user` a locked legacy pool position backed by freshly minted tokens.
    pub fn seed_cake_pool(
        &mut self,
        user: &Address,
        amount: u128,
        lock_end_time: u64,
        boosted_share: u128,
    ) -> Result<u128, SyncError> {
        let shares = self
            .cake_pool
            .deposit(user, amount, lock_end_time, boosted_share)?;
        self.ledger.token_mut().mint(&self.cake_pool.address(), amount)?;
        Ok(shares)
    }

    pub fn withdraw_all(&mut self, caller: &Address, recipient: &Address, now: u64) -> Result<Withdrawal, SyncError> {
        self.ledger
            .withdraw_all(caller, recipient, &mut self.cake_pool, now)
    }

    pub fn migrate_from_cake_pool(&mut self, caller: &Address, now: u64) -> Result<UserInfo, SyncError> {
        self.ledger
            .migrate_from_cake_pool(caller, &mut self.cake_pool, now)
    }

    pub fn get_estimate_gas_fees(
        &self,
        transport: &LocalTransport,
        sender: &Address,
        dst: ChannelId,
        extra_gas: u128,
    ) -> Result<u128, SyncError> {
        self.sender(sender)?.get_estimate_gas_fees(transport, dst, extra_gas)
    }

    pub fn send_sync_msg(
        &self,
        transport: &mut LocalTransport,
        sender: &Address,
        request: SyncRequest,
        fee_paid: u128,
    ) -> Result<MessageReceipt, SyncError> {
        let ctx = SendContext {
            ledger: &self.ledger,
            profiles: &self.profiles,
            transport,
        };
        self.sender(sender)?.send_sync_msg(ctx, request, fee_paid)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESTINATION CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Applied,
    Duplicate,
}

#[derive(Debug)]
pub struct DestinationChain {
    pub channel: ChannelId,
    pub receivers: BTreeMap<Address, SyncReceiver>,
    pub mirrors: BTreeMap<Address, MirrorLedger>,
    pub profile_mirrors: BTreeMap<Address, ProfileMirror>,
}

impl DestinationChain {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            receivers: BTreeMap::new(),
            mirrors: BTreeMap::new(),
            profile_mirrors: BTreeMap::new(),
        }
    }

    pub fn mirror(&self, address: &Address) -> Result<&MirrorLedger, SyncError> {
        self.mirrors.get(address).ok_or(SyncError::NotDeployed(*address))
    }

    pub fn profile_mirror(&self, address: &Address) -> Result<&ProfileMirror, SyncError> {
        self.profile_mirrors
            .get(address)
            .ok_or(SyncError::NotDeployed(*address))
    }

    /// Hand a packet to its receiver and apply it to every target mirror.
    ///
    /// Either every write lands and the nonce is committed, or nothing
    /// changes.
    pub fn deliver(&mut self, packet: &Packet, now: u64) -> Result<DeliveryOutcome, SyncError> {
        let receiver_address = packet.receiver.to_address().unwrap_or_default();
        let receiver = self
            .receivers
            .get_mut(&receiver_address)
            .ok_or(SyncError::NotDeployed(receiver_address))?;

        let plan = match receiver.prepare(&packet.origin, &packet.payload)? {
            Delivery::Duplicate => {
                info!(nonce = packet.origin.nonce, "duplicate packet ignored");
                return Ok(DeliveryOutcome::Duplicate);
            }
            Delivery::Apply(plan) => plan,
        };

        if let Some(target) = plan.lock_target {
            self.mirrors
                .get(&target)
                .ok_or(SyncError::NotDeployed(target))?
                .ensure_receiver(&receiver_address)?;
        }
        if let Some(target) = plan.profile_target {
            self.profile_mirrors
                .get(&target)
                .ok_or(SyncError::NotDeployed(target))?
                .ensure_receiver(&receiver_address)?;
        }

        let payload = plan.payload;
        if let Some(mirror) = plan.lock_target.and_then(|t| self.mirrors.get_mut(&t)) {
            let update = MirrorUpdate {
                account: payload.account,
                lock: payload.lock,
                proxy: payload.proxy().map(|proxy| (proxy, payload.proxy_lock)),
                synced_at: now,
            };
            mirror.sync(&receiver_address, &update)?;
        }
        if let Some(mirror) = plan.profile_target.and_then(|t| self.profile_mirrors.get_mut(&t)) {
            mirror.sync(&receiver_address, &payload.account, payload.profile_active)?;
        }
        receiver.commit(&plan.origin);

        info!(
            account = %payload.account,
            src = packet.origin.src_channel,
            nonce = packet.origin.nonce,
            "sync message applied"
        );
        Ok(DeliveryOutcome::Applied)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct NetworkSetup {
    pub owner: Address,
    pub origin_channel: ChannelId,
    pub dest_channel: ChannelId,
    pub endpoint: EndpointConfig,
    pub genesis_time: u64,
}

/// Addresses of the default deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub owner: Address,
    pub ledger: Address,
    pub cake_pool: Address,
    pub sender: Address,
    pub receiver: Address,
    pub ve_proxy: Address,
    pub profile_proxy: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayFailure {
    pub guid: String,
    pub nonce: u64,
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    pub delivered: usize,
    pub duplicates: usize,
    pub failed: Vec<RelayFailure>,
}

#[derive(Debug)]
pub struct SyncNetwork {
    pub origin: OriginChain,
    pub destination: DestinationChain,
    pub transport: LocalTransport,
    deployment: Deployment,
    now: u64,
}

impl SyncNetwork {
    /// Deploy a V2 sender/receiver pair with both mirrors bound to it.
    pub fn bootstrap(setup: NetworkSetup) -> Result<Self, SyncError> {
        let owner = setup.owner;
        let ledger = Address::derive(b"vesync/ve-cake");
        let cake_pool = Address::derive(b"vesync/cake-pool");
        let ve_proxy = Address::derive(b"vesync/ve-cake-proxy");
        let profile_proxy = Address::derive(b"vesync/profile-proxy");

        let mut transport = LocalTransport::new();
        transport.register_endpoint(setup.dest_channel, setup.endpoint);

        let mut destination = DestinationChain::new(setup.dest_channel);
        destination
            .mirrors
            .insert(ve_proxy, MirrorLedger::new(ve_proxy, owner, Address::ZERO));
        destination.profile_mirrors.insert(
            profile_proxy,
            ProfileMirror::new(profile_proxy, owner, Address::ZERO),
        );

        let mut network = Self {
            origin: OriginChain::new(setup.origin_channel, ledger, cake_pool),
            destination,
            transport,
            deployment: Deployment {
                owner,
                ledger,
                cake_pool,
                sender: Address::ZERO,
                receiver: Address::ZERO,
                ve_proxy,
                profile_proxy,
            },
            now: setup.genesis_time,
        };

        let (sender, receiver) = network.deploy_pair(ProtocolVersion::V2, "v2")?;
        network.bind_mirrors(&receiver)?;
        network.deployment.sender = sender;
        network.deployment.receiver = receiver;

        info!(
            origin = setup.origin_channel,
            destination = setup.dest_channel,
            sender = %sender,
            receiver = %receiver,
            "sync network bootstrapped"
        );
        Ok(network)
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock forward and mine one block.
    pub fn advance_time(&mut self, seconds: u64) -> u64 {
        self.now = self.now.saturating_add(seconds);
        self.transport.mine(1);
        self.now
    }

    /// Deploy a sender/receiver pair that trust each other and dispatch to
    /// the default mirrors. The mirrors stay bound to their current receiver.
    pub fn deploy_pair(&mut self, version: ProtocolVersion, label: &str) -> Result<(Address, Address), SyncError> {
        let owner = self.deployment.owner;
        let src = self.origin.channel;
        let dst = self.destination.channel;
        let sender_address = Address::derive(format!("vesync/sender/{}", label).as_bytes());
        let receiver_address = Address::derive(format!("vesync/receiver/{}", label).as_bytes());

        let mut sender = SyncSender::new(sender_address, owner, src, version);
        let mut receiver = SyncReceiver::new(receiver_address, owner, dst, version);
        match version {
            ProtocolVersion::V1 => {
                sender.set_trusted_remote(&owner, dst, &trusted_remote_path(&receiver_address, &sender_address))?;
                receiver.set_trusted_remote(&owner, src, &trusted_remote_path(&sender_address, &receiver_address))?;
            }
            ProtocolVersion::V2 => {
                sender.set_peer(&owner, dst, receiver_address.to_peer())?;
                receiver.set_peer(&owner, src, sender_address.to_peer())?;
            }
        }
        receiver.update_proxy_contract(&owner, self.deployment.ve_proxy, self.deployment.profile_proxy)?;

        self.origin.senders.insert(sender_address, sender);
        self.destination.receivers.insert(receiver_address, receiver);
        Ok((sender_address, receiver_address))
    }

    /// Point both mirrors at `receiver`.
    pub fn bind_mirrors(&mut self, receiver: &Address) -> Result<(), SyncError> {
        let owner = self.deployment.owner;
        let ve_proxy = self.deployment.ve_proxy;
        let profile_proxy = self.deployment.profile_proxy;
        self.destination
            .mirrors
            .get_mut(&ve_proxy)
            .ok_or(SyncError::NotDeployed(ve_proxy))?
            .update_receiver(&owner, *receiver)?;
        self.destination
            .profile_mirrors
            .get_mut(&profile_proxy)
            .ok_or(SyncError::NotDeployed(profile_proxy))?
            .update_receiver(&owner, *receiver)?;
        Ok(())
    }

    pub fn mirror(&self) -> Result<&MirrorLedger, SyncError> {
        self.destination.mirror(&self.deployment.ve_proxy)
    }

    pub fn profile_mirror(&self) -> Result<&ProfileMirror, SyncError> {
        self.destination.profile_mirror(&self.deployment.profile_proxy)
    }

    pub fn estimate_fee(&self, sender: &Address, extra_gas: u128) -> Result<u128, SyncError> {
        self.origin
            .get_estimate_gas_fees(&self.transport, sender, self.destination.channel, extra_gas)
    }

    pub fn send_sync(
        &mut self,
        sender: &Address,
        request: SyncRequest,
        fee_paid: u128,
    ) -> Result<MessageReceipt, SyncError> {
        self.origin
            .send_sync_msg(&mut self.transport, sender, request, fee_paid)
    }

    /// Deliver every ready packet. Failed packets are dropped; the mirror
    /// stays stale until the account is synced again.
    pub fn relay(&mut self) -> RelayReport {
        let mut report = RelayReport::default();
        for packet in self.transport.drain_ready() {
            match self.destination.deliver(&packet, self.now) {
                Ok(DeliveryOutcome::Applied) => report.delivered += 1,
                Ok(DeliveryOutcome::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    warn!(
                        nonce = packet.origin.nonce,
                        guid = %hex::encode(packet.guid),
                        error = %e,
                        "packet delivery failed"
                    );
                    report.failed.push(RelayFailure {
                        guid: format!("0x{}", hex::encode(packet.guid)),
                        nonce: packet.origin.nonce,
                        code: e.code(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}
