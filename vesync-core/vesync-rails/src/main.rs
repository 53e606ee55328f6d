//! veToken Sync Rail Service
//!
//! Entry point for the cross-chain lock sync devnet.

use vesync_rails::main_entry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    main_entry::run_server().await
}
