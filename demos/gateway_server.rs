//! Gateway server example
//!
//! Run with: cargo run --example gateway_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example gateway_server                  # binds to 0.0.0.0:7070
//!   cargo run --example gateway_server localhost        # binds to 127.0.0.1:7070
//!   cargo run --example gateway_server 127.0.0.1:7071   # binds to 127.0.0.1:7071
//!
//! Devices on the allow-list can connect and exchange frames; every
//! connected device is polled for status once a second. Classified payloads
//! are forwarded to the backend configured in `HttpSinkConfig` (disable or
//! repoint it below).

use std::net::SocketAddr;
use std::sync::Arc;

use tsc_gateway::admission::MemoryAllowlist;
use tsc_gateway::protocol::MessageType;
use tsc_gateway::sink::{HttpSink, HttpSinkConfig};
use tsc_gateway::{GatewayConfig, GatewayServer};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:7070
/// - "127.0.0.1" -> 127.0.0.1:7070
/// - "127.0.0.1:7071" -> 127.0.0.1:7071
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 7070;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: gateway_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:7070)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:7070".parse().unwrap(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tsc_gateway=debug".parse()?)
                .add_directive("gateway_server=debug".parse()?),
        )
        .init();

    // Empty list = open mode; add device addresses to restrict admission
    let allowlist = MemoryAllowlist::new();
    allowlist.add("127.0.0.1", Some("Localhost".into())).await;
    allowlist.add("10.1.1.20", Some("Test Client".into())).await;

    let sink = HttpSink::new(HttpSinkConfig::default())?;
    if sink.test_connection().await {
        println!("Backend reachable at {}", sink.config().base_url);
    } else {
        println!("Backend not reachable, payloads will be logged and dropped");
    }

    let config = GatewayConfig::with_addr(bind_addr);
    println!("Starting gateway server on {}", config.bind_addr);

    let server = GatewayServer::new(config)
        .allowlist(Arc::new(allowlist))
        .sink(Arc::new(sink));

    server
        .handlers()
        .register(MessageType::IntersectionStatus, |message| {
            println!(
                "[{}] intersection status, {} payload bytes",
                message.client_id,
                message.size()
            );
        })
        .await;

    server
        .run_until(async {
            tokio::signal::ctrl_c().await.ok();
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
