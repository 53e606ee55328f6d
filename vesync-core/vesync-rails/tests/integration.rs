//! Integration tests for the veToken sync rail
//!
//! These tests drive the devnet over HTTP:
//! 1. Creating and extending locks on the origin ledger
//! 2. Quoting, sending and relaying sync messages
//! 3. Reading the mirrored balance on the destination
//! 4. Pool migration, withdrawal and admin pausing

use axum_test::TestServer;
use serde_json::json;
use vesync_core::{curve::WEEK, Address, AddressExt};
use vesync_rails::{app_router, config::RailConfig, AppState};

const UNIT: u128 = 1_000_000_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn create_test_server() -> TestServer {
    let state = AppState::new(RailConfig::default()).unwrap();
    TestServer::new(app_router(state)).unwrap()
}

fn account(label: &str) -> String {
    Address::derive(label.as_bytes()).to_string()
}

fn admin() -> String {
    RailConfig::default().admin.to_string()
}

fn json_address(value: &serde_json::Value) -> Address {
    value.as_str().unwrap().parse().unwrap()
}

fn units(n: u128) -> String {
    (n * UNIT).to_string()
}

async fn now(server: &TestServer) -> u64 {
    let body: serde_json::Value = server.get("/rails/vesync/info").await.json();
    body["now"].as_u64().unwrap()
}

async fn fund_and_lock(server: &TestServer, who: &str, amount: u128, weeks: u64) {
    let start = now(server).await;
    server
        .post("/rails/vesync/faucet")
        .json(&json!({ "account": who, "amount": units(amount) }))
        .await
        .assert_status_ok();
    server
        .post("/rails/vesync/locks/create")
        .json(&json!({
            "account": who,
            "amount": units(amount),
            "unlock_time": start + weeks * WEEK
        }))
        .await
        .assert_status_ok();
}

async fn sync_and_relay(server: &TestServer, who: &str) -> serde_json::Value {
    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": who, "sync_profile": true }))
        .await;
    response.assert_status_ok();

    let relay: serde_json::Value = server.post("/rails/vesync/relay").await.json();
    relay
}

async fn mirror(server: &TestServer, who: &str) -> serde_json::Value {
    let response = server.get(&format!("/rails/vesync/mirror/{}", who)).await;
    response.assert_status_ok();
    response.json()
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH & INFO TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rail_id"], "VESYNC_LAYERZERO");
}

#[tokio::test]
async fn test_info_endpoint() {
    let server = create_test_server();

    let response = server.get("/rails/vesync/info").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["origin_channel"], 30102);
    assert_eq!(body["dest_channel"], 30101);
    assert_eq!(body["pending_packets"], 0);
    assert_eq!(json_address(&body["deployment"]["owner"]), RailConfig::default().admin);
    assert_eq!(body["endpoint"]["max_message_size"], 10_000);
}

#[tokio::test]
async fn test_chains_endpoint() {
    let server = create_test_server();

    let response = server.get("/rails/vesync/chains").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let chains = body["chains"].as_array().unwrap();
    assert!(chains.iter().any(|c| c["channel"] == 30101 && c["display_name"] == "Ethereum"));

    let configured = body["configured_endpoints"].as_array().unwrap();
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0]["channel"], 30101);
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK & SYNC TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_lock_sync_relay_mirror() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 1_000, 10).await;

    let before = mirror(&server, &alice).await;
    assert_eq!(before["sync"]["status"], "unsynced");
    assert_eq!(before["balance"], "0");

    let relay = sync_and_relay(&server, &alice).await;
    assert_eq!(relay["report"]["delivered"], 1);
    assert_eq!(relay["pending_packets"], 0);

    let after = mirror(&server, &alice).await;
    assert_eq!(after["sync"]["status"], "synced");
    assert_eq!(after["balance"], after["origin_balance"]);
    assert_ne!(after["balance"], "0");

    let locks: serde_json::Value = server
        .get(&format!("/rails/vesync/locks/{}", alice))
        .await
        .json();
    assert_eq!(after["lock"], locks["lock"]);

    // Both sides decay identically.
    server
        .post("/rails/vesync/time/advance")
        .json(&json!({ "seconds": 3 * WEEK }))
        .await
        .assert_status_ok();
    let later = mirror(&server, &alice).await;
    assert_eq!(later["balance"], later["origin_balance"]);
    assert_ne!(later["balance"], after["balance"]);
}

#[tokio::test]
async fn test_stale_until_resynced() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 500, 10).await;
    sync_and_relay(&server, &alice).await;

    server
        .post("/rails/vesync/faucet")
        .json(&json!({ "account": alice, "amount": units(250) }))
        .await
        .assert_status_ok();
    let response = server
        .post("/rails/vesync/locks/increase-amount")
        .json(&json!({ "account": alice, "amount": units(250) }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["lock"]["amount"], units(750));

    let stale = mirror(&server, &alice).await;
    assert_eq!(stale["lock"]["amount"], units(500));
    assert_ne!(stale["balance"], stale["origin_balance"]);

    sync_and_relay(&server, &alice).await;
    let fresh = mirror(&server, &alice).await;
    assert_eq!(fresh["lock"]["amount"], units(750));
    assert_eq!(fresh["balance"], fresh["origin_balance"]);
}

#[tokio::test]
async fn test_increase_unlock_time() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 100, 4).await;
    let start = now(&server).await;

    let response = server
        .post("/rails/vesync/locks/increase-unlock-time")
        .json(&json!({ "account": alice, "unlock_time": start + 2 * WEEK }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "UNLOCK_TIME_NOT_INCREASED");

    let response = server
        .post("/rails/vesync/locks/increase-unlock-time")
        .json(&json!({ "account": alice, "unlock_time": start + 20 * WEEK }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let end = body["lock"]["end"].as_u64().unwrap();
    assert_eq!(end % WEEK, 0);
    assert!(end > start + 19 * WEEK);
}

#[tokio::test]
async fn test_create_lock_rejections() {
    let server = create_test_server();
    let bob = account("bob");
    let start = now(&server).await;

    // No tokens yet.
    let response = server
        .post("/rails/vesync/locks/create")
        .json(&json!({ "account": bob, "amount": units(1), "unlock_time": start + 4 * WEEK }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INSUFFICIENT_BALANCE");

    // More than the maximum lock duration.
    server
        .post("/rails/vesync/faucet")
        .json(&json!({ "account": bob, "amount": units(1) }))
        .await
        .assert_status_ok();
    let response = server
        .post("/rails/vesync/locks/create")
        .json(&json!({ "account": bob, "amount": units(1), "unlock_time": start + 300 * WEEK }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "UNLOCK_TIME_TOO_LATE");

    let response = server
        .post("/rails/vesync/locks/create")
        .json(&json!({ "account": bob, "amount": "not-a-number", "unlock_time": start + 4 * WEEK }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn test_sync_with_no_flags_rejected() {
    let server = create_test_server();

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": account("nobody"), "sync_lock": false }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "NOTHING_TO_SYNC");
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_estimate_fee_grows_with_extra_gas() {
    let server = create_test_server();

    let base: serde_json::Value = server
        .post("/rails/vesync/estimate-fee")
        .json(&json!({}))
        .await
        .json();
    let boosted: serde_json::Value = server
        .post("/rails/vesync/estimate-fee")
        .json(&json!({ "extra_gas": "200000" }))
        .await
        .json();

    let base_fee: u128 = base["native_fee"].as_str().unwrap().parse().unwrap();
    let boosted_fee: u128 = boosted["native_fee"].as_str().unwrap().parse().unwrap();
    assert!(base_fee > 0);
    assert!(boosted_fee > base_fee);
}

#[tokio::test]
async fn test_underpayment_rejected() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 10, 10).await;

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": alice, "fee": "1" }))
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "UNDERPAID");

    let info: serde_json::Value = server.get("/rails/vesync/info").await.json();
    assert_eq!(info["pending_packets"], 0);
}

#[tokio::test]
async fn test_overpayment_refunded() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 10, 10).await;

    let quote: serde_json::Value = server
        .post("/rails/vesync/estimate-fee")
        .json(&json!({}))
        .await
        .json();
    let fee: u128 = quote["native_fee"].as_str().unwrap().parse().unwrap();

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": alice, "fee": (fee + 1_000).to_string() }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["fee"], fee.to_string());
    assert_eq!(body["refund"], "1000");
    assert_eq!(body["nonce"], 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADMIN TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_paused_sender_rejects_sync() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 10, 10).await;

    // Only the owner may pause.
    let response = server
        .post("/rails/vesync/admin/pause")
        .json(&json!({ "caller": alice, "paused": true }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    server
        .post("/rails/vesync/admin/pause")
        .json(&json!({ "caller": admin(), "paused": true }))
        .await
        .assert_status_ok();

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": alice }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Pausable: paused");

    server
        .post("/rails/vesync/admin/pause")
        .json(&json!({ "caller": admin(), "paused": false }))
        .await
        .assert_status_ok();
    let relay = sync_and_relay(&server, &alice).await;
    assert_eq!(relay["report"]["delivered"], 1);
}

#[tokio::test]
async fn test_sync_on_behalf_of_another_account() {
    let server = create_test_server();
    let alice = account("alice");
    fund_and_lock(&server, &alice, 10, 10).await;

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": alice, "caller": account("keeper") }))
        .await;
    response.assert_status_ok();
    server.post("/rails/vesync/relay").await.assert_status_ok();

    let body = mirror(&server, &alice).await;
    assert_eq!(body["balance"], body["origin_balance"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROFILE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_status_synced() {
    let server = create_test_server();
    let carol = account("carol");

    server
        .post("/rails/vesync/profile/create")
        .json(&json!({ "account": carol }))
        .await
        .assert_status_ok();

    let response = server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": carol, "sync_lock": false, "sync_profile": true }))
        .await;
    response.assert_status_ok();
    server.post("/rails/vesync/relay").await.assert_status_ok();
    assert_eq!(mirror(&server, &carol).await["profile_active"], true);

    server
        .post("/rails/vesync/profile/pause")
        .json(&json!({ "account": carol, "paused": true }))
        .await
        .assert_status_ok();
    server
        .post("/rails/vesync/sync")
        .json(&json!({ "account": carol, "sync_lock": false, "sync_profile": true }))
        .await
        .assert_status_ok();
    server.post("/rails/vesync/relay").await.assert_status_ok();
    assert_eq!(mirror(&server, &carol).await["profile_active"], false);
}

#[tokio::test]
async fn test_pause_unknown_profile_forbidden() {
    let server = create_test_server();

    let response = server
        .post("/rails/vesync/profile/pause")
        .json(&json!({ "account": account("ghost"), "paused": true }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

// ═══════════════════════════════════════════════════════════════════════════════
// MIGRATION & WITHDRAWAL TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_migration_synced_to_mirror() {
    let server = create_test_server();
    let dave = account("dave");
    let start = now(&server).await;

    let response = server
        .post("/rails/vesync/cake-pool/deposit")
        .json(&json!({
            "account": dave,
            "amount": units(2_000),
            "lock_end_time": start + 30 * WEEK
        }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/rails/vesync/locks/migrate")
        .json(&json!({ "account": dave }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_info"]["cake_pool_type"], 1);
    assert_eq!(body["user_info"]["cake_amount"], (2_000 * UNIT - 1).to_string());
    let proxy = json_address(&body["user_info"]["cake_pool_proxy"]);

    // Second migration is refused.
    let response = server
        .post("/rails/vesync/locks/migrate")
        .json(&json!({ "account": dave }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    let locks: serde_json::Value = server
        .get(&format!("/rails/vesync/locks/{}", dave))
        .await
        .json();
    assert_eq!(locks["lock"]["amount"], "0");
    assert_eq!(locks["proxy_lock"]["amount"], (2_000 * UNIT - 1).to_string());

    let relay = sync_and_relay(&server, &dave).await;
    assert_eq!(relay["report"]["delivered"], 1);

    let body = mirror(&server, &dave).await;
    assert_eq!(json_address(&body["sync"]["cake_pool_proxy"]), proxy);
    assert_eq!(body["balance"], body["origin_balance"]);
    assert_ne!(body["balance"], "0");
}

#[tokio::test]
async fn test_withdraw_and_relock() {
    let server = create_test_server();
    let erin = account("erin");
    fund_and_lock(&server, &erin, 300, 2).await;

    let response = server
        .post("/rails/vesync/locks/withdraw")
        .json(&json!({ "account": erin }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "LOCK_NOT_EXPIRED");

    server
        .post("/rails/vesync/time/advance")
        .json(&json!({ "seconds": 3 * WEEK }))
        .await
        .assert_status_ok();

    let response = server
        .post("/rails/vesync/locks/withdraw")
        .json(&json!({ "account": erin }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["native"], units(300));
    assert_eq!(body["migrated"], "0");

    // The mirror drops to zero once synced with the empty lock.
    sync_and_relay(&server, &erin).await;
    let body = mirror(&server, &erin).await;
    assert_eq!(body["lock"]["amount"], "0");
    assert_eq!(body["balance"], "0");

    fund_and_lock(&server, &erin, 300, 8).await;
    sync_and_relay(&server, &erin).await;
    let body = mirror(&server, &erin).await;
    assert_eq!(body["lock"]["amount"], units(300));
    assert_eq!(body["balance"], body["origin_balance"]);
}
