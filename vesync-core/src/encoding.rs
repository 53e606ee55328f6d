//! ABI encoding/decoding for sync messages
//!
//! The payload is a static Solidity tuple of ten 32-byte words:
//!
//! ```text
//! (address account, bool syncLock, uint256 amount, uint256 end,
//!  address cakePoolProxy, uint256 proxyAmount, uint256 proxyEnd,
//!  bool syncProfile, bool profileActive, uint256 extraGas)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::types::{Address, LockedBalance};

const WORD: usize = 32;

/// Number of words in an encoded [`SyncPayload`].
pub const SYNC_PAYLOAD_WORDS: usize = 10;

/// Size in bytes of an encoded [`SyncPayload`].
pub const SYNC_PAYLOAD_LEN: usize = SYNC_PAYLOAD_WORDS * WORD;

/// Snapshot of one account's lock and profile state at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub account: Address,
    pub sync_lock: bool,
    /// Native lock of `account`; ignored unless `sync_lock`.
    pub lock: LockedBalance,
    /// Pool proxy holding a migrated position, zero when there is none.
    pub cake_pool_proxy: Address,
    pub proxy_lock: LockedBalance,
    pub sync_profile: bool,
    pub profile_active: bool,
    /// Destination gas requested on top of the default budget.
    pub extra_gas: u128,
}

impl SyncPayload {
    pub fn proxy(&self) -> Option<Address> {
        if self.cake_pool_proxy.is_zero() {
            None
        } else {
            Some(self.cake_pool_proxy)
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_sync_payload(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        decode_sync_payload(bytes)
    }
}

/// Encode a sync payload for transmission
pub fn encode_sync_payload(payload: &SyncPayload) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(SYNC_PAYLOAD_LEN);

    put_address(&mut encoded, &payload.account);
    put_bool(&mut encoded, payload.sync_lock);
    put_uint(&mut encoded, payload.lock.amount);
    put_uint(&mut encoded, payload.lock.end as u128);
    put_address(&mut encoded, &payload.cake_pool_proxy);
    put_uint(&mut encoded, payload.proxy_lock.amount);
    put_uint(&mut encoded, payload.proxy_lock.end as u128);
    put_bool(&mut encoded, payload.sync_profile);
    put_bool(&mut encoded, payload.profile_active);
    put_uint(&mut encoded, payload.extra_gas);

    encoded
}

/// Decode a sync payload, rejecting anything that is not canonical ABI
pub fn decode_sync_payload(bytes: &[u8]) -> Result<SyncPayload, SyncError> {
    if bytes.len() != SYNC_PAYLOAD_LEN {
        return Err(SyncError::Decoding(format!(
            "sync payload must be {} bytes, got {}",
            SYNC_PAYLOAD_LEN,
            bytes.len()
        )));
    }

    let mut words = bytes.chunks_exact(WORD).enumerate();
    let mut next = || {
        words
            .next()
            .ok_or_else(|| SyncError::Decoding("sync payload truncated".into()))
    };

    let (i, w) = next()?;
    let account = read_address(i, w)?;
    let (i, w) = next()?;
    let sync_lock = read_bool(i, w)?;
    let (i, w) = next()?;
    let amount = read_uint(i, w)?;
    let (i, w) = next()?;
    let end = read_u64(i, w)?;
    let (i, w) = next()?;
    let cake_pool_proxy = read_address(i, w)?;
    let (i, w) = next()?;
    let proxy_amount = read_uint(i, w)?;
    let (i, w) = next()?;
    let proxy_end = read_u64(i, w)?;
    let (i, w) = next()?;
    let sync_profile = read_bool(i, w)?;
    let (i, w) = next()?;
    let profile_active = read_bool(i, w)?;
    let (i, w) = next()?;
    let extra_gas = read_uint(i, w)?;

    Ok(SyncPayload {
        account,
        sync_lock,
        lock: LockedBalance::new(amount, end),
        cake_pool_proxy,
        proxy_lock: LockedBalance::new(proxy_amount, proxy_end),
        sync_profile,
        profile_active,
        extra_gas,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORD HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn put_address(out: &mut Vec<u8>, address: &Address) {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_slice());
    out.extend_from_slice(&word);
}

fn put_bool(out: &mut Vec<u8>, value: bool) {
    let mut word = [0u8; WORD];
    word[31] = value as u8;
    out.extend_from_slice(&word);
}

fn put_uint(out: &mut Vec<u8>, value: u128) {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    out.extend_from_slice(&word);
}

fn read_address(index: usize, word: &[u8]) -> Result<Address, SyncError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(SyncError::Decoding(format!(
            "word {}: address has dirty high bytes",
            index
        )));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address::from(out))
}

fn read_bool(index: usize, word: &[u8]) -> Result<bool, SyncError> {
    match read_uint(index, word)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SyncError::Decoding(format!(
            "word {}: invalid bool value {}",
            index, other
        ))),
    }
}

fn read_uint(index: usize, word: &[u8]) -> Result<u128, SyncError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(SyncError::Decoding(format!(
            "word {}: integer does not fit in 128 bits",
            index
        )));
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(out))
}

fn read_u64(index: usize, word: &[u8]) -> Result<u64, SyncError> {
    let value = read_uint(index, word)?;
    u64::try_from(value).map_err(|_| {
        SyncError::Decoding(format!("word {}: timestamp {} overflows u64", index, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyncPayload {
        SyncPayload {
            account: Address::repeat_byte(0x11),
            sync_lock: true,
            lock: LockedBalance::new(1_000_000_000_000_000_000_000, 1_717_027_200),
            cake_pool_proxy: Address::repeat_byte(0x22),
            proxy_lock: LockedBalance::new(2_345, 1_735_171_200),
            sync_profile: true,
            profile_active: false,
            extra_gas: 13_500_000,
        }
    }

    #[test]
    fn test_word_layout() {
        let encoded = sample().encode();
        assert_eq!(encoded.len(), SYNC_PAYLOAD_LEN);

        // account, left padded
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], &[0x11; 20]);
        // syncLock = true
        assert_eq!(encoded[63], 1);
        // end in word 3
        let end = u64::from_be_bytes(encoded[3 * 32 + 24..4 * 32].try_into().unwrap());
        assert_eq!(end, 1_717_027_200);
        // profileActive = false
        assert_eq!(encoded[8 * 32 + 31], 0);

        assert_eq!(SyncPayload::decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let encoded = sample().encode();
        assert!(decode_sync_payload(&encoded[..SYNC_PAYLOAD_LEN - 1]).is_err());
        let mut longer = encoded.clone();
        longer.push(0);
        assert!(decode_sync_payload(&longer).is_err());
        assert!(decode_sync_payload(&[]).is_err());
    }

    #[test]
    fn test_rejects_non_canonical_words() {
        let mut dirty_address = sample().encode();
        dirty_address[4 * 32] = 1;
        assert!(decode_sync_payload(&dirty_address).is_err());

        let mut bad_bool = sample().encode();
        bad_bool[7 * 32 + 31] = 2;
        assert!(decode_sync_payload(&bad_bool).is_err());

        let mut wide_amount = sample().encode();
        wide_amount[2 * 32] = 1;
        assert!(decode_sync_payload(&wide_amount).is_err());

        let mut wide_end = sample().encode();
        wide_end[3 * 32 + 20] = 1;
        assert!(decode_sync_payload(&wide_end).is_err());
    }
}
