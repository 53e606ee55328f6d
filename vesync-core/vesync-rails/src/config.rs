//! Rail configuration.

use anyhow::{Context, Result};
use std::env;

use vesync_core::{chains, Address, AddressExt, EndpointConfig, NetworkSetup};

const DEFAULT_PORT: u16 = 3010;
const DEFAULT_GENESIS_TIME: u64 = 1_700_000_000;

/// Rail configuration.
#[derive(Clone, Debug)]
pub struct RailConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Owner of every deployed sender, receiver and mirror.
    pub admin: Address,
    /// Endpoint id of the chain holding the lock ledger.
    pub origin_channel: u32,
    /// Endpoint id of the mirror chain.
    pub dest_channel: u32,
    /// Fee, executor and confirmation settings of the destination endpoint.
    pub endpoint: EndpointConfig,
    /// Clock value the devnet starts at.
    pub genesis_time: u64,
}

impl Default for RailConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin: Address::derive(b"vesync/admin"),
            origin_channel: chains::BSC,
            dest_channel: chains::ETHEREUM,
            endpoint: EndpointConfig::default(),
            genesis_time: DEFAULT_GENESIS_TIME,
        }
    }
}

impl RailConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let endpoint = EndpointConfig {
            base_fee: parse_var("VESYNC_BASE_FEE", defaults.endpoint.base_fee)?,
            gas_price: parse_var("VESYNC_GAS_PRICE", defaults.endpoint.gas_price)?,
            default_gas: parse_var("VESYNC_DEFAULT_GAS", defaults.endpoint.default_gas)?,
            fee_per_byte: parse_var("VESYNC_FEE_PER_BYTE", defaults.endpoint.fee_per_byte)?,
            max_message_size: parse_var(
                "VESYNC_MAX_MESSAGE_SIZE",
                defaults.endpoint.max_message_size,
            )?,
            confirmations: parse_var("VESYNC_CONFIRMATIONS", defaults.endpoint.confirmations)?,
        };

        let admin = match env::var("VESYNC_ADMIN") {
            Ok(value) => value
                .parse::<Address>()
                .context("VESYNC_ADMIN must be a 20-byte hex address")?,
            Err(_) => defaults.admin,
        };

        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            admin,
            origin_channel: parse_var("VESYNC_ORIGIN_CHANNEL", defaults.origin_channel)?,
            dest_channel: parse_var("VESYNC_DEST_CHANNEL", defaults.dest_channel)?,
            endpoint,
            genesis_time: parse_var("VESYNC_GENESIS_TIME", defaults.genesis_time)?,
        };

        if config.origin_channel == config.dest_channel {
            anyhow::bail!(
                "VESYNC_ORIGIN_CHANNEL and VESYNC_DEST_CHANNEL must differ (both {})",
                config.origin_channel
            );
        }
        Ok(config)
    }

    pub fn network_setup(&self) -> NetworkSetup {
        NetworkSetup {
            owner: self.admin,
            origin_channel: self.origin_channel,
            dest_channel: self.dest_channel,
            endpoint: self.endpoint,
            genesis_time: self.genesis_time,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
