//! vesync-rails
//!
//! Axum-based HTTP service running a two-chain veToken sync devnet.
//! Clients drive the origin lock ledger, quote and send sync messages,
//! relay them through the local transport and read the mirrored balances.

pub mod config;

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use vesync_core::{
    chains, Address, ErrorKind, LockedBalance, ProfileRegistry, SyncError, SyncNetwork,
    SyncRequest, SyncStatus, UserInfo, RAIL_ID_VESYNC,
};

use crate::config::RailConfig;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// The devnet; one lock serializes every operation
    pub network: Arc<RwLock<SyncNetwork>>,
    pub config: Arc<RailConfig>,
}

impl AppState {
    pub fn new(config: RailConfig) -> Result<Self, SyncError> {
        let network = SyncNetwork::bootstrap(config.network_setup())?;
        Ok(Self {
            network: Arc::new(RwLock::new(network)),
            config: Arc::new(config),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the router
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health))
        .route("/rails/vesync/info", get(info))
        .route("/rails/vesync/chains", get(list_chains))
        // Origin ledger
        .route("/rails/vesync/faucet", post(faucet))
        .route("/rails/vesync/locks/create", post(create_lock))
        .route("/rails/vesync/locks/increase-amount", post(increase_lock_amount))
        .route("/rails/vesync/locks/increase-unlock-time", post(increase_unlock_time))
        .route("/rails/vesync/locks/withdraw", post(withdraw_all))
        .route("/rails/vesync/locks/migrate", post(migrate_from_cake_pool))
        .route("/rails/vesync/locks/:account", get(get_locks))
        .route("/rails/vesync/cake-pool/deposit", post(cake_pool_deposit))
        // Profiles
        .route("/rails/vesync/profile/create", post(create_profile))
        .route("/rails/vesync/profile/pause", post(pause_profile))
        // Messaging
        .route("/rails/vesync/estimate-fee", post(estimate_fee))
        .route("/rails/vesync/sync", post(send_sync))
        .route("/rails/vesync/relay", post(relay))
        // Destination
        .route("/rails/vesync/mirror/:account", get(get_mirror))
        // Admin & clock
        .route("/rails/vesync/admin/pause", post(pause_sender))
        .route("/rails/vesync/time/advance", post(advance_time))
        .layer(cors)
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - HEALTH & INFO
// ═══════════════════════════════════════════════════════════════════════════════

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "rail_id": RAIL_ID_VESYNC
    }))
}

async fn info(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let net = state.network.read().await;
    let deployment = *net.deployment();
    let sender = net.origin.sender(&deployment.sender)?;
    let endpoint = state.config.endpoint;

    Ok(Json(serde_json::json!({
        "rail_id": RAIL_ID_VESYNC,
        "origin_channel": state.config.origin_channel,
        "dest_channel": state.config.dest_channel,
        "now": net.now(),
        "block": net.transport.block(),
        "pending_packets": net.transport.pending(),
        "fees_collected": net.transport.fees_collected().to_string(),
        "sender_paused": sender.is_paused(),
        "deployment": deployment,
        "endpoint": {
            "base_fee": endpoint.base_fee.to_string(),
            "gas_price": endpoint.gas_price.to_string(),
            "default_gas": endpoint.default_gas.to_string(),
            "fee_per_byte": endpoint.fee_per_byte.to_string(),
            "max_message_size": endpoint.max_message_size,
            "confirmations": endpoint.confirmations
        },
        "total_locked": net.origin.ledger.total_locked().to_string()
    })))
}

async fn list_chains(State(state): State<AppState>) -> impl IntoResponse {
    let net = state.network.read().await;
    let configured: Vec<_> = net
        .transport
        .endpoints()
        .map(|(channel, endpoint)| {
            serde_json::json!({
                "channel": channel,
                "known": chains::is_known_chain(channel),
                "max_message_size": endpoint.max_message_size,
                "confirmations": endpoint.confirmations
            })
        })
        .collect();

    Json(serde_json::json!({
        "chains": chains::all_chains().iter().map(|c| serde_json::json!({
            "channel": c.channel,
            "display_name": c.display_name,
            "chain_id": c.chain_id,
            "default_gas": c.default_gas.to_string(),
            "origin": c.origin,
            "production_ready": c.production_ready
        })).collect::<Vec<_>>(),
        "configured_endpoints": configured
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - ORIGIN LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub account: String,
    pub amount: String,
}

async fn faucet(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let amount = parse_amount("amount", &req.amount)?;

    let mut net = state.network.write().await;
    net.origin.ledger.token_mut().mint(&account, amount)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "token_balance": net.origin.ledger.token().balance_of(&account).to_string()
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateLockRequest {
    pub account: String,
    pub amount: String,
    pub unlock_time: u64,
}

async fn create_lock(
    State(state): State<AppState>,
    Json(req): Json<CreateLockRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let amount = parse_amount("amount", &req.amount)?;

    let mut net = state.network.write().await;
    let now = net.now();
    let lock = net
        .origin
        .ledger
        .create_lock(&account, amount, req.unlock_time, now)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "lock": lock_json(&lock)
    })))
}

#[derive(Debug, Deserialize)]
pub struct IncreaseAmountRequest {
    pub account: String,
    pub amount: String,
}

async fn increase_lock_amount(
    State(state): State<AppState>,
    Json(req): Json<IncreaseAmountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let delta = parse_amount("amount", &req.amount)?;

    let mut net = state.network.write().await;
    let now = net.now();
    let lock = net.origin.ledger.increase_lock_amount(&account, delta, now)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "lock": lock_json(&lock)
    })))
}

#[derive(Debug, Deserialize)]
pub struct IncreaseUnlockTimeRequest {
    pub account: String,
    pub unlock_time: u64,
}

async fn increase_unlock_time(
    State(state): State<AppState>,
    Json(req): Json<IncreaseUnlockTimeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;

    let mut net = state.network.write().await;
    let now = net.now();
    let lock = net
        .origin
        .ledger
        .increase_unlock_time(&account, req.unlock_time, now)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "lock": lock_json(&lock)
    })))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub account: String,
    /// Defaults to `account`
    pub recipient: Option<String>,
}

async fn withdraw_all(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let recipient = match &req.recipient {
        Some(r) => parse_address(r)?,
        None => account,
    };

    let mut net = state.network.write().await;
    let now = net.now();
    let withdrawal = net.origin.withdraw_all(&account, &recipient, now)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "recipient": recipient,
        "native": withdrawal.native.to_string(),
        "migrated": withdrawal.migrated.to_string(),
        "total": withdrawal.total().to_string()
    })))
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

async fn migrate_from_cake_pool(
    State(state): State<AppState>,
    Json(req): Json<AccountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;

    let mut net = state.network.write().await;
    let now = net.now();
    let user_info = net.origin.migrate_from_cake_pool(&account, now)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "user_info": user_info_json(&user_info)
    })))
}

async fn get_locks(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&account)?;

    let net = state.network.read().await;
    let now = net.now();
    let ledger = &net.origin.ledger;
    let user_info = ledger.get_user_info(&account);
    let proxy_lock = user_info.live_proxy().map(|proxy| ledger.locks(&proxy));

    Ok(Json(serde_json::json!({
        "account": account,
        "now": now,
        "lock": lock_json(&ledger.locks(&account)),
        "proxy_lock": proxy_lock.as_ref().map(lock_json),
        "user_info": user_info_json(&user_info),
        "balance": ledger.balance_of(&account, now).to_string(),
        "token_balance": ledger.token().balance_of(&account).to_string(),
        "proxy_owner": ledger.proxy_owner(&account)
    })))
}

#[derive(Debug, Deserialize)]
pub struct CakePoolDepositRequest {
    pub account: String,
    pub amount: String,
    pub lock_end_time: u64,
    pub boosted_share: Option<String>,
}

async fn cake_pool_deposit(
    State(state): State<AppState>,
    Json(req): Json<CakePoolDepositRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let amount = parse_amount("amount", &req.amount)?;
    let boosted_share = match &req.boosted_share {
        Some(b) => parse_amount("boosted_share", b)?,
        None => 0,
    };

    let mut net = state.network.write().await;
    let shares = net
        .origin
        .seed_cake_pool(&account, amount, req.lock_end_time, boosted_share)?;

    Ok(Json(serde_json::json!({
        "account": account,
        "shares": shares.to_string(),
        "lock_end_time": req.lock_end_time
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - PROFILES
// ═══════════════════════════════════════════════════════════════════════════════

async fn create_profile(
    State(state): State<AppState>,
    Json(req): Json<AccountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;

    let mut net = state.network.write().await;
    net.origin.profiles.create_profile(&account);

    Ok(Json(serde_json::json!({
        "account": account,
        "active": true
    })))
}

#[derive(Debug, Deserialize)]
pub struct PauseProfileRequest {
    pub account: String,
    pub paused: bool,
}

async fn pause_profile(
    State(state): State<AppState>,
    Json(req): Json<PauseProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;

    let mut net = state.network.write().await;
    if req.paused {
        net.origin.profiles.pause_profile(&account)?;
    } else {
        net.origin.profiles.reactivate_profile(&account)?;
    }

    Ok(Json(serde_json::json!({
        "account": account,
        "active": net.origin.profiles.is_active(&account)
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - MESSAGING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct EstimateFeeRequest {
    pub extra_gas: Option<String>,
    /// Defaults to the bootstrapped sender
    pub sender: Option<String>,
}

async fn estimate_fee(
    State(state): State<AppState>,
    Json(req): Json<EstimateFeeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let extra_gas = parse_optional_amount("extra_gas", req.extra_gas.as_deref())?;

    let net = state.network.read().await;
    let sender = resolve_sender(&net, req.sender.as_deref())?;
    let fee = net.estimate_fee(&sender, extra_gas)?;

    Ok(Json(serde_json::json!({
        "dst": state.config.dest_channel,
        "extra_gas": extra_gas.to_string(),
        "native_fee": fee.to_string()
    })))
}

#[derive(Debug, Deserialize)]
pub struct SendSyncRequest {
    pub account: String,
    /// Defaults to `account`
    pub caller: Option<String>,
    pub sender: Option<String>,
    #[serde(default = "default_true")]
    pub sync_lock: bool,
    #[serde(default)]
    pub sync_profile: bool,
    pub extra_gas: Option<String>,
    /// Defaults to the current quote
    pub fee: Option<String>,
}

fn default_true() -> bool {
    true
}

async fn send_sync(
    State(state): State<AppState>,
    Json(req): Json<SendSyncRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&req.account)?;
    let caller = match &req.caller {
        Some(c) => parse_address(c)?,
        None => account,
    };
    let extra_gas = parse_optional_amount("extra_gas", req.extra_gas.as_deref())?;

    let mut net = state.network.write().await;
    let sender = resolve_sender(&net, req.sender.as_deref())?;
    let fee_paid = match &req.fee {
        Some(f) => parse_amount("fee", f)?,
        None => net.estimate_fee(&sender, extra_gas)?,
    };

    let request = SyncRequest {
        caller,
        dst: state.config.dest_channel,
        account,
        sync_lock: req.sync_lock,
        sync_profile: req.sync_profile,
        extra_gas,
    };
    let receipt = net.send_sync(&sender, request, fee_paid)?;

    Ok(Json(serde_json::json!({
        "guid": format!("0x{}", hex::encode(receipt.guid)),
        "nonce": receipt.nonce,
        "fee": receipt.fee.to_string(),
        "refund": receipt.refund.to_string(),
        "dst": state.config.dest_channel
    })))
}

async fn relay(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut net = state.network.write().await;
    let report = net.relay();

    Ok(Json(serde_json::json!({
        "report": report,
        "pending_packets": net.transport.pending()
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - DESTINATION
// ═══════════════════════════════════════════════════════════════════════════════

async fn get_mirror(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&account)?;

    let net = state.network.read().await;
    let now = net.now();
    let mirror = net.mirror()?;
    let profile_mirror = net.profile_mirror()?;

    let status = match mirror.sync_status(&account) {
        SyncStatus::Unsynced => serde_json::json!({ "status": "unsynced" }),
        SyncStatus::Synced {
            lock,
            cake_pool_proxy,
            proxy_lock,
            synced_at,
        } => serde_json::json!({
            "status": "synced",
            "lock": lock_json(&lock),
            "cake_pool_proxy": cake_pool_proxy,
            "proxy_lock": lock_json(&proxy_lock),
            "synced_at": synced_at
        }),
    };

    Ok(Json(serde_json::json!({
        "account": account,
        "now": now,
        "lock": lock_json(&mirror.locks(&account)),
        "balance": mirror.balance_of(&account, now).to_string(),
        "origin_balance": net.origin.ledger.balance_of(&account, now).to_string(),
        "profile_active": profile_mirror.is_active(&account),
        "sync": status
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - ADMIN & CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct PauseSenderRequest {
    pub caller: String,
    pub paused: bool,
    pub sender: Option<String>,
}

async fn pause_sender(
    State(state): State<AppState>,
    Json(req): Json<PauseSenderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let caller = parse_address(&req.caller)?;

    let mut net = state.network.write().await;
    let sender = resolve_sender(&net, req.sender.as_deref())?;
    net.origin.sender_mut(&sender)?.pause(&caller, req.paused)?;

    Ok(Json(serde_json::json!({
        "sender": sender,
        "paused": req.paused
    })))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceTimeRequest {
    pub seconds: u64,
}

async fn advance_time(
    State(state): State<AppState>,
    Json(req): Json<AdvanceTimeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut net = state.network.write().await;
    let now = net.advance_time(req.seconds);
    tracing::debug!(now, "devnet clock advanced");

    Ok(Json(serde_json::json!({
        "now": now,
        "block": net.transport.block()
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR HANDLING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let status = match err.kind() {
            ErrorKind::Precondition | ErrorKind::Codec => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Paused => StatusCode::CONFLICT,
            ErrorKind::Underpayment => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::Transport => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: err.to_string(),
            code: err.code().into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.message,
            "error_code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_address(value: &str) -> Result<Address, ApiError> {
    value.trim().parse::<Address>().map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid address {:?}: {}", value, e),
        code: "INVALID_ADDRESS".into(),
    })
}

fn parse_amount(field: &str, value: &str) -> Result<u128, ApiError> {
    value.trim().parse().map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid {}: {}", field, e),
        code: "INVALID_AMOUNT".into(),
    })
}

fn parse_optional_amount(field: &str, value: Option<&str>) -> Result<u128, ApiError> {
    value.map(|v| parse_amount(field, v)).unwrap_or(Ok(0))
}

fn resolve_sender(net: &SyncNetwork, sender: Option<&str>) -> Result<Address, ApiError> {
    match sender {
        Some(s) => parse_address(s),
        None => Ok(net.deployment().sender),
    }
}

fn lock_json(lock: &LockedBalance) -> serde_json::Value {
    serde_json::json!({
        "amount": lock.amount.to_string(),
        "end": lock.end
    })
}

fn user_info_json(info: &UserInfo) -> serde_json::Value {
    serde_json::json!({
        "amount": info.amount.to_string(),
        "end": info.end,
        "cake_pool_proxy": info.cake_pool_proxy,
        "cake_amount": info.cake_amount.to_string(),
        "lock_end_time": info.lock_end_time,
        "migration_time": info.migration_time,
        "cake_pool_type": info.cake_pool_type as u8,
        "withdraw_flag": info.withdraw_flag as u8
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub mod main_entry {
    use super::*;
    use std::net::SocketAddr;

    pub async fn run_server() -> anyhow::Result<()> {
        // .env must be loaded before the filter reads RUST_LOG
        dotenvy::dotenv().ok();

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "vesync_rails=info,vesync_core=info".into()),
            )
            .init();

        let config = RailConfig::from_env()?;
        let port = config.port;
        let state = AppState::new(config)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("veToken sync rail listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app_router(state)).await?;

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
