//! Messaging endpoint identifiers and per-chain defaults
//!
//! Endpoint ids follow the LayerZero V2 numbering: mainnets in the 30xxx
//! range, testnets in the 40xxx range.

use serde::Serialize;

use crate::types::ChannelId;

// ═══════════════════════════════════════════════════════════════════════════════
// MAINNET ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ethereum mainnet
pub const ETHEREUM: ChannelId = 30101;
/// BNB Chain
pub const BSC: ChannelId = 30102;
/// Arbitrum One
pub const ARBITRUM: ChannelId = 30110;
/// Polygon zkEVM
pub const POLYGON_ZKEVM: ChannelId = 30158;
/// zkSync Era
pub const ZKSYNC: ChannelId = 30165;
/// Linea
pub const LINEA: ChannelId = 30183;
/// Base
pub const BASE: ChannelId = 30184;
/// opBNB
pub const OPBNB: ChannelId = 30202;

// ═══════════════════════════════════════════════════════════════════════════════
// TESTNET ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// BNB Chain testnet
pub const BSC_TESTNET: ChannelId = 40102;
/// Ethereum Sepolia
pub const SEPOLIA: ChannelId = 40161;
/// Arbitrum Sepolia
pub const ARBITRUM_SEPOLIA: ChannelId = 40231;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN INFO
// ═══════════════════════════════════════════════════════════════════════════════

/// Chain information structure
#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    pub channel: ChannelId,
    /// Human-readable chain name
    pub display_name: &'static str,
    /// EVM chain id
    pub chain_id: u64,
    /// Default destination gas for a sync message
    pub default_gas: u128,
    /// Whether the chain can originate locks
    pub origin: bool,
    pub production_ready: bool,
}

/// Get info for a known endpoint
pub fn get_chain_info(channel: ChannelId) -> Option<ChainInfo> {
    let info = |display_name, chain_id, default_gas, origin, production_ready| ChainInfo {
        channel,
        display_name,
        chain_id,
        default_gas,
        origin,
        production_ready,
    };
    match channel {
        ETHEREUM => Some(info("Ethereum", 1, 500_000, false, true)),
        BSC => Some(info("BNB Chain", 56, 500_000, true, true)),
        ARBITRUM => Some(info("Arbitrum One", 42161, 1_000_000, false, true)),
        POLYGON_ZKEVM => Some(info("Polygon zkEVM", 1101, 500_000, false, true)),
        ZKSYNC => Some(info("zkSync Era", 324, 2_000_000, false, true)),
        LINEA => Some(info("Linea", 59144, 500_000, false, true)),
        BASE => Some(info("Base", 8453, 500_000, false, true)),
        OPBNB => Some(info("opBNB", 204, 500_000, false, true)),
        BSC_TESTNET => Some(info("BNB Chain Testnet", 97, 500_000, true, false)),
        SEPOLIA => Some(info("Ethereum Sepolia", 11155111, 500_000, false, false)),
        ARBITRUM_SEPOLIA => Some(info("Arbitrum Sepolia", 421614, 1_000_000, false, false)),
        _ => None,
    }
}

/// Get all known endpoints
pub fn all_chains() -> Vec<ChainInfo> {
    [
        ETHEREUM,
        BSC,
        ARBITRUM,
        POLYGON_ZKEVM,
        ZKSYNC,
        LINEA,
        BASE,
        OPBNB,
        BSC_TESTNET,
        SEPOLIA,
        ARBITRUM_SEPOLIA,
    ]
    .into_iter()
    .filter_map(get_chain_info)
    .collect()
}

/// Get endpoints that can receive sync messages
pub fn destination_chains() -> Vec<ChainInfo> {
    all_chains().into_iter().filter(|c| !c.origin).collect()
}

/// Check if an endpoint id is known
pub fn is_known_chain(channel: ChannelId) -> bool {
    get_chain_info(channel).is_some()
}
