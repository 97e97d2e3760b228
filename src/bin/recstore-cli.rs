//! recstore-cli - one-shot client for recstore
//!
//! Usage: `recstore-cli <host> <port> <command> [args...]`
//!
//! The command and its arguments are joined with single spaces and sent as
//! one request line. Each reply message is printed on its own line; the
//! `END` terminator is not printed.

use recstore::client::request;
use recstore::protocol::TERMINATOR;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    // Quiet unless RUST_LOG asks otherwise; stdout carries the replies
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        println!("Usage: recstore-cli <host> <port> <command> [args...]");
        return ExitCode::FAILURE;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Client error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> anyhow::Result<()> {
    let host = &args[0];
    let port: u16 = args[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid port: {}", args[1]))?;
    let line = args[2..].join(" ");

    let mut messages = request(
        (host.as_str(), port),
        &line,
        recstore::DEFAULT_CONNECT_TIMEOUT,
    )
    .await?;

    if messages.last().map(String::as_str) == Some(TERMINATOR) {
        messages.pop();
    }
    for message in &messages {
        println!("{}", message);
    }
    Ok(())
}
