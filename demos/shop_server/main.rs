//! Demo order workflow server
//!
//! Serves the REST API and the `/ws` projection feed on 127.0.0.1:3000.
//! Identity comes from the `x-user-id` and `x-user-role` headers.
//!
//! ```text
//! cargo run --example shop_server -- demos/shop_server/shop.yaml
//!
//! curl -X POST localhost:3000/orders \
//!   -H 'x-user-id: tailor-1' -H 'x-user-role: Tailor' \
//!   -H 'content-type: application/json' -d @order.json
//! ```

use stitchflow::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stitchflow=debug,tower_http=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading shop configuration");
            ShopConfig::from_yaml_file(&path)?
        }
        None => ShopConfig::default_config(),
    };

    println!("🧵 StitchFlow order workflow server");
    println!("   - {} garment prices on the rate card", config.rate_card.len());
    println!("   - advance ratio {}", config.advance_ratio);
    println!("   - REST on http://127.0.0.1:3000/orders");
    println!("   - live feed on ws://127.0.0.1:3000/ws\n");

    ShopServerBuilder::new()
        .with_config(config)
        .serve("127.0.0.1:3000")
        .await
}
