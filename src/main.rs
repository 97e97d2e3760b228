//! recstore - A Concurrent In-Memory Record Store
//!
//! This is the main entry point for the recstore server.
//! It parses the command line, binds the listener and runs the accept loop.

use anyhow::Context;
use recstore::server::{Server, ServerConfig};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Parse configuration from command-line arguments
fn config_from_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Ok(secret) = std::env::var(recstore::SECRET_ENV_VAR) {
        config.secret = secret;
    }

    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                config.host = required_value(&args, i, "--host").to_string();
                i += 2;
            }
            "--port" | "-p" => {
                config.port = parse_port(required_value(&args, i, "--port"));
                i += 2;
            }
            "--secret" | "-s" => {
                config.secret = required_value(&args, i, "--secret").to_string();
                i += 2;
            }
            "--read-timeout" => {
                let secs: u64 = required_value(&args, i, "--read-timeout")
                    .parse()
                    .unwrap_or_else(|_| {
                        eprintln!("Error: invalid read timeout");
                        std::process::exit(1);
                    });
                config.read_timeout = (secs > 0).then(|| Duration::from_secs(secs));
                i += 2;
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("recstore version {}", recstore::VERSION);
                std::process::exit(0);
            }
            // A bare number is the port
            arg if !arg.starts_with('-') => {
                config.port = parse_port(arg);
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn required_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn parse_port(value: &str) -> u16 {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid port number");
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
recstore - A Concurrent In-Memory Record Store

USAGE:
    recstore [PORT] [OPTIONS]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: {host})
    -p, --port <PORT>            Port to listen on (default: {port})
    -s, --secret <SECRET>        Secret required by GETALL (env: {env})
        --read-timeout <SECS>    Wait for a request at most SECS seconds, 0 = forever (default: {timeout})
    -v, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    recstore                     # Start on {host}:{port}
    recstore 9000                # Start on port 9000
    recstore --secret hunter2    # Use a custom dump secret

CONNECTING:
    $ recstore-cli 127.0.0.1 {port} INIT
    USERCODE 1
    $ recstore-cli 127.0.0.1 {port} PUT 1 Alice Paris France
    OK
    $ recstore-cli 127.0.0.1 {port} GET 1 city
    Paris
"#,
        host = recstore::DEFAULT_HOST,
        port = recstore::DEFAULT_PORT,
        env = recstore::SECRET_ENV_VAR,
        timeout = recstore::DEFAULT_READ_TIMEOUT.as_secs(),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("recstore v{} starting", recstore::VERSION);
    if config.secret == recstore::DEFAULT_SECRET {
        info!("Using the built-in GETALL secret; set {} to override", recstore::SECRET_ENV_VAR);
    }

    // Bind the TCP listener
    let server = Server::bind(&config)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    let store = server.store();
    let stats = server.stats();
    info!("Server started on port {}", config.port);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = server.run() => {}
        _ = shutdown => {}
    }

    let store_stats = store.stats();
    info!(
        records = store_stats.records,
        handles_issued = store_stats.handles_issued,
        updates = store_stats.updates,
        reads = store_stats.reads,
        deletes = store_stats.deletes,
        dumps = store_stats.dumps,
        auth_failures = store_stats.auth_failures,
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        malformed = stats.malformed_requests.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
