//! Cross-chain transport interface and the in-process endpoint pair.
//!
//! [`LocalTransport`] stands in for the messaging layer: it quotes fees from a
//! per-destination [`EndpointConfig`], assigns per-path nonces and GUIDs,
//! and releases packets in per-path send order once enough blocks have passed.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::types::{Address, AddressExt, ChannelId, PeerId};

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Where an inbound packet came from, as attested by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    pub src_channel: ChannelId,
    pub sender: PeerId,
    pub nonce: u64,
}

/// A message handed to [`Transport::send`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub src_channel: ChannelId,
    pub sender: Address,
    pub dst_channel: ChannelId,
    pub receiver: PeerId,
    pub payload: Vec<u8>,
    pub extra_gas: u128,
}

/// A message in flight, as it will be presented to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub guid: [u8; 32],
    pub origin: Origin,
    pub dst_channel: ChannelId,
    pub receiver: PeerId,
    pub payload: Vec<u8>,
    pub sent_at_block: u64,
}

/// Acceptance record returned by a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageReceipt {
    pub guid: [u8; 32],
    pub nonce: u64,
    pub fee: u128,
    /// Amount paid above the quote, returned to the caller.
    pub refund: u128,
}

pub trait Transport {
    /// Fee required to send `payload_len` bytes to `dst` with `extra_gas`.
    fn quote(&self, dst: ChannelId, payload_len: usize, extra_gas: u128) -> Result<u128, SyncError>;

    /// Accept a message for delivery. Fails with [`SyncError::Underpaid`]
    /// when `fee_paid` is below the quote.
    fn send(&mut self, message: OutboundMessage, fee_paid: u128) -> Result<MessageReceipt, SyncError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENDPOINT CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Pricing, executor and verification settings for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_fee: u128,
    pub gas_price: u128,
    pub default_gas: u128,
    pub fee_per_byte: u128,
    /// Largest payload the executor accepts.
    pub max_message_size: usize,
    /// Blocks a packet waits before it is deliverable.
    pub confirmations: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_fee: 10_000_000_000_000,
            gas_price: 3_000_000_000,
            default_gas: 500_000,
            fee_per_byte: 1_000_000_000,
            max_message_size: 10_000,
            confirmations: 1,
        }
    }
}

impl EndpointConfig {
    pub fn fee(&self, payload_len: usize, extra_gas: u128) -> Result<u128, SyncError> {
        let gas = self
            .default_gas
            .checked_add(extra_gas)
            .ok_or(SyncError::Overflow("fee gas"))?;
        gas.checked_mul(self.gas_price)
            .and_then(|v| v.checked_add(self.base_fee))
            .and_then(|v| {
                (payload_len as u128)
                    .checked_mul(self.fee_per_byte)
                    .and_then(|bytes| v.checked_add(bytes))
            })
            .ok_or(SyncError::Overflow("fee"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCAL TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PathKey {
    src: ChannelId,
    sender: Address,
    dst: ChannelId,
    receiver: PeerId,
}

/// In-memory endpoint pair with per-path FIFO delivery.
#[derive(Debug, Default)]
pub struct LocalTransport {
    endpoints: BTreeMap<ChannelId, EndpointConfig>,
    nonces: HashMap<PathKey, u64>,
    queue: VecDeque<Packet>,
    block: u64,
    fees_collected: u128,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_endpoint(&mut self, channel: ChannelId, config: EndpointConfig) {
        self.endpoints.insert(channel, config);
    }

    pub fn endpoint(&self, channel: ChannelId) -> Option<&EndpointConfig> {
        self.endpoints.get(&channel)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (ChannelId, &EndpointConfig)> {
        self.endpoints.iter().map(|(c, e)| (*c, e))
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    /// Advance the block counter without sending anything.
    pub fn mine(&mut self, blocks: u64) {
        self.block = self.block.saturating_add(blocks);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn fees_collected(&self) -> u128 {
        self.fees_collected
    }

    /// Remove and return every packet whose confirmations have elapsed.
    ///
    /// Packets on the same path come out in send order; a packet never
    /// overtakes an earlier one on its path.
    pub fn drain_ready(&mut self) -> Vec<Packet> {
        let mut ready = Vec::new();
        let mut blocked: Vec<PathKey> = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.queue.len());

        while let Some(packet) = self.queue.pop_front() {
            let key = path_key(&packet);
            let confirmations = self
                .endpoints
                .get(&packet.dst_channel)
                .map(|e| e.confirmations)
                .unwrap_or(0);
            let is_ready = self.block >= packet.sent_at_block.saturating_add(confirmations);
            if is_ready && !blocked.contains(&key) {
                ready.push(packet);
            } else {
                blocked.push(key);
                waiting.push_back(packet);
            }
        }

        self.queue = waiting;
        ready
    }

    fn next_nonce(&mut self, key: PathKey) -> u64 {
        let nonce = self.nonces.entry(key).or_insert(0);
        *nonce += 1;
        *nonce
    }
}

impl Transport for LocalTransport {
    fn quote(&self, dst: ChannelId, payload_len: usize, extra_gas: u128) -> Result<u128, SyncError> {
        let endpoint = self.endpoints.get(&dst).ok_or(SyncError::UnknownChannel(dst))?;
        if payload_len > endpoint.max_message_size {
            return Err(SyncError::MessageTooLarge {
                size: payload_len,
                max: endpoint.max_message_size,
            });
        }
        endpoint.fee(payload_len, extra_gas)
    }

    fn send(&mut self, message: OutboundMessage, fee_paid: u128) -> Result<MessageReceipt, SyncError> {
        let fee = self.quote(message.dst_channel, message.payload.len(), message.extra_gas)?;
        if fee_paid < fee {
            return Err(SyncError::Underpaid {
                required: fee,
                paid: fee_paid,
            });
        }

        let key = PathKey {
            src: message.src_channel,
            sender: message.sender,
            dst: message.dst_channel,
            receiver: message.receiver,
        };
        let nonce = self.next_nonce(key);
        let guid = compute_guid(nonce, &key);
        let packet = Packet {
            guid,
            origin: Origin {
                src_channel: message.src_channel,
                sender: message.sender.to_peer(),
                nonce,
            },
            dst_channel: message.dst_channel,
            receiver: message.receiver,
            payload: message.payload,
            sent_at_block: self.block,
        };

        self.queue.push_back(packet);
        self.fees_collected = self.fees_collected.saturating_add(fee);
        self.block += 1;

        info!(
            src = message.src_channel,
            dst = message.dst_channel,
            nonce,
            fee,
            guid = %hex::encode(guid),
            "message accepted"
        );
        debug!(refund = fee_paid - fee, "excess fee refunded");

        Ok(MessageReceipt {
            guid,
            nonce,
            fee,
            refund: fee_paid - fee,
        })
    }
}

fn path_key(packet: &Packet) -> PathKey {
    PathKey {
        src: packet.origin.src_channel,
        sender: packet.origin.sender.to_address().unwrap_or_default(),
        dst: packet.dst_channel,
        receiver: packet.receiver,
    }
}

/// `keccak256(nonce ++ src ++ sender ++ dst ++ receiver)`
fn compute_guid(nonce: u64, key: &PathKey) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(key.src.to_be_bytes());
    hasher.update(key.sender.to_peer().0);
    hasher.update(key.dst.to_be_bytes());
    hasher.update(key.receiver.0.as_slice());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: ChannelId = 30102;
    const DST: ChannelId = 30101;

    fn message(sender: &[u8], payload_len: usize) -> OutboundMessage {
        OutboundMessage {
            src_channel: SRC,
            sender: Address::derive(sender),
            dst_channel: DST,
            receiver: Address::derive(b"receiver").to_peer(),
            payload: vec![7u8; payload_len],
            extra_gas: 0,
        }
    }

    fn transport(confirmations: u64) -> LocalTransport {
        let mut t = LocalTransport::new();
        t.register_endpoint(
            DST,
            EndpointConfig {
                confirmations,
                ..EndpointConfig::default()
            },
        );
        t
    }

    #[test]
    fn test_quote_formula() {
        let t = transport(1);
        let cfg = EndpointConfig::default();
        let fee = t.quote(DST, 320, 13_500_000).unwrap();
        assert_eq!(
            fee,
            cfg.base_fee + (cfg.default_gas + 13_500_000) * cfg.gas_price + 320 * cfg.fee_per_byte
        );
        assert!(fee > t.quote(DST, 320, 0).unwrap());
        assert!(matches!(t.quote(SRC, 320, 0), Err(SyncError::UnknownChannel(SRC))));
        assert!(matches!(
            t.quote(DST, 10_001, 0),
            Err(SyncError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_underpaid_send_is_rejected_and_excess_refunded() {
        let mut t = transport(1);
        let fee = t.quote(DST, 320, 0).unwrap();

        let err = t.send(message(b"sender", 320), fee - 1).unwrap_err();
        assert!(matches!(err, SyncError::Underpaid { .. }));
        assert_eq!(t.pending(), 0);

        let receipt = t.send(message(b"sender", 320), fee + 5).unwrap();
        assert_eq!(receipt.nonce, 1);
        assert_eq!(receipt.fee, fee);
        assert_eq!(receipt.refund, 5);
        assert_eq!(t.fees_collected(), fee);
    }

    #[test]
    fn test_per_path_nonces_and_fifo() {
        let mut t = transport(3);
        let fee = t.quote(DST, 320, 0).unwrap();

        let a1 = t.send(message(b"a", 320), fee).unwrap();
        let b1 = t.send(message(b"b", 320), fee).unwrap();
        let a2 = t.send(message(b"a", 320), fee).unwrap();
        assert_eq!((a1.nonce, b1.nonce, a2.nonce), (1, 1, 2));
        assert_ne!(a1.guid, b1.guid);

        // Block is now 3; only the first packet has 3 confirmations.
        let ready = t.drain_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].guid, a1.guid);

        t.mine(10);
        let ready = t.drain_ready();
        let order: Vec<_> = ready.iter().map(|p| p.guid).collect();
        assert_eq!(order, vec![b1.guid, a2.guid]);
        assert_eq!(t.pending(), 0);
    }
}
