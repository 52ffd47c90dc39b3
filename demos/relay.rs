//! Transparent handshake relay example
//!
//! Run with: cargo run --example relay -- 0.0.0.0:1935 192.168.20.111:1935
//!
//! Point a player (VLC, ffplay) at the relay address. The relay forwards
//! the handshake to the upstream server, verifies both sides' digests and
//! signatures, then splices the two connections.

use rtmp_relay::{RelayConfig, RelayServer, SpliceHandler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_relay=debug".parse()?)
                .add_directive("relay=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (bind, upstream) = match (args.next(), args.next()) {
        (Some(bind), Some(upstream)) => (bind, upstream),
        _ => {
            eprintln!("Usage: relay <bind_addr> <upstream_addr>");
            eprintln!("Example: relay 0.0.0.0:1935 192.168.20.111:1935");
            std::process::exit(1);
        }
    };

    let config = RelayConfig::new(upstream).bind(bind.parse()?);
    let relay = RelayServer::new(config, SpliceHandler);

    relay
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
