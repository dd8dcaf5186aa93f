use anyhow::{Context as _, Result};
use clap::Parser;
use mip_wire::{Record, SduType};
use seqpacket::SeqPacketStream;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

const PONG_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one ping over MIP and reports the round-trip time.
#[derive(Parser, Debug)]
#[command(name = "ping-client")]
struct Cli {
    /// Path of the Unix socket of the local MIP daemon.
    socket_path: PathBuf,

    /// MIP address of the destination host.
    dest_mip: u8,

    /// The message to send.
    message: String,

    /// Time-to-live of the ping.
    #[arg(default_value_t = 8)]
    ttl: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[expect(clippy::print_stderr, reason = "No logger has been set up yet")]
    if let Err(e) = mip_logging::setup(false) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stdout, reason = "The ping result is the program's output")]
async fn run(cli: Cli) -> Result<()> {
    let stream = SeqPacketStream::connect(&cli.socket_path).with_context(|| {
        format!(
            "Failed to connect to MIP daemon at {}",
            cli.socket_path.display()
        )
    })?;

    stream
        .send(&[SduType::Ping as u8])
        .context("Failed to identify with MIP daemon")?;

    let ping = Record::new(cli.dest_mip, cli.ttl, cli.message.clone().into_bytes());

    let start = Instant::now();

    stream.send(&ping.encode()).context("Failed to send ping")?;

    let mut buf = [0u8; 1024];

    let received = tokio::time::timeout(PONG_TIMEOUT, stream.recv(&mut buf)).await;

    let elapsed = start.elapsed();

    let len = match received {
        Err(_) => {
            println!("timeout");
            return Ok(());
        }
        Ok(result) => result.context("Failed to receive pong")?,
    };

    let pong = Record::decode(&buf[..len]).context("Failed to decode pong")?;
    let payload = String::from_utf8_lossy(&pong.payload);

    // The pong is "PONG:" + the message we sent.
    let echoed = payload.split_once(':').map(|(_, rest)| rest);

    if echoed != Some(cli.message.as_str()) {
        println!("Received pong message does not match sent message");
    }

    println!("Received: {payload}, RTT: {:.4} seconds", elapsed.as_secs_f64());

    Ok(())
}
