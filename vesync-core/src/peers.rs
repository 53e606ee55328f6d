//! Trusted remote identities per channel.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SyncError;
use crate::types::{Address, AddressExt, ChannelId, PeerId};

/// Length of a packed `remote ++ local` trusted-remote path.
pub const TRUSTED_REMOTE_PATH_LEN: usize = 40;

/// Peer configuration for one endpoint application.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeerTable {
    peers: BTreeMap<ChannelId, PeerId>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_peer(&mut self, channel: ChannelId, peer: PeerId) {
        if peer == PeerId::default() {
            self.peers.remove(&channel);
        } else {
            self.peers.insert(channel, peer);
        }
    }

    /// Set the peer from a packed `remote ++ local` path.
    ///
    /// The local half must name `local`, the application being configured.
    pub fn set_trusted_remote(
        &mut self,
        channel: ChannelId,
        path: &[u8],
        local: &Address,
    ) -> Result<Address, SyncError> {
        let remote = parse_trusted_remote(path, local)?;
        self.set_peer(channel, remote.to_peer());
        Ok(remote)
    }

    pub fn peer(&self, channel: ChannelId) -> Option<PeerId> {
        self.peers.get(&channel).copied()
    }

    pub fn require_peer(&self, channel: ChannelId) -> Result<PeerId, SyncError> {
        self.peer(channel).ok_or(SyncError::PeerNotSet(channel))
    }

    /// Verify that `sender` is the configured peer for `channel`
    pub fn is_trusted(&self, channel: ChannelId, sender: &PeerId) -> bool {
        self.peer(channel).as_ref() == Some(sender)
    }

    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, PeerId)> + '_ {
        self.peers.iter().map(|(c, p)| (*c, *p))
    }
}

/// Pack a trusted-remote path as `remote ++ local`.
pub fn trusted_remote_path(remote: &Address, local: &Address) -> Vec<u8> {
    let mut path = Vec::with_capacity(TRUSTED_REMOTE_PATH_LEN);
    path.extend_from_slice(remote.as_slice());
    path.extend_from_slice(local.as_slice());
    path
}

fn parse_trusted_remote(path: &[u8], local: &Address) -> Result<Address, SyncError> {
    if path.len() != TRUSTED_REMOTE_PATH_LEN {
        return Err(SyncError::InvalidTrustedRemote(format!(
            "path must be {} bytes, got {}",
            TRUSTED_REMOTE_PATH_LEN,
            path.len()
        )));
    }
    if &path[20..] != local.as_slice() {
        return Err(SyncError::InvalidTrustedRemote(format!(
            "local half does not match {}",
            local
        )));
    }
    let mut remote = [0u8; 20];
    remote.copy_from_slice(&path[..20]);
    Ok(Address::from(remote))
}
