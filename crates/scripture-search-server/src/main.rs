//! Primary entrypoint for the `scripture-search-server` binary.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    scripture_search_server::run().await
}
