//! Complex handshake probe
//!
//! Run with: cargo run --example probe -- rtmp://localhost/live
//!
//! Dials an RTMP server, performs the complex handshake and reports which
//! digest scheme the server answered with.

use rtmp_relay::{ClientConfig, RtmpConnector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_relay=debug".parse()?),
        )
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: probe <rtmp_url>");
        eprintln!("Example: probe rtmp://localhost/live");
        std::process::exit(1);
    });

    println!("Connecting to {}", url);

    match RtmpConnector::connect(ClientConfig::new(&url)).await {
        Ok(connector) => {
            println!(
                "Handshake OK, server digest scheme: {:?}",
                connector.stream().peer_scheme()
            );
        }
        Err(e) => {
            eprintln!("Handshake failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
