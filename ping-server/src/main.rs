use anyhow::{Context as _, Result, bail};
use clap::Parser;
use mip_wire::{MAX_SDU_LEN, MAX_TTL, Record, SduType};
use seqpacket::SeqPacketStream;
use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;

/// Answers every received ping with `PONG:` + the original message.
#[derive(Parser, Debug)]
#[command(name = "ping-server")]
struct Cli {
    /// Path of the Unix socket of the local MIP daemon.
    socket_path: PathBuf,
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
        Ok(never) => match never {},
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Infallible> {
    let stream = SeqPacketStream::connect(&cli.socket_path).with_context(|| {
        format!(
            "Failed to connect to MIP daemon at {}",
            cli.socket_path.display()
        )
    })?;

    stream
        .send(&[SduType::Ping as u8])
        .context("Failed to identify with MIP daemon")?;

    tracing::info!(socket = %cli.socket_path.display(), "Ping server running");

    let mut buf = [0u8; 1024];

    loop {
        let len = stream
            .recv(&mut buf)
            .await
            .context("Failed to read from MIP daemon")?;

        if len == 0 {
            bail!("MIP daemon closed the connection");
        }

        let ping = match Record::decode(&buf[..len]) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Dropping undecodable record: {e}");
                continue;
            }
        };

        tracing::info!(
            from = ping.addr,
            message = %String::from_utf8_lossy(&ping.payload),
            "Received ping"
        );

        let mut payload = b"PONG:".to_vec();
        payload.extend_from_slice(&ping.payload);
        payload.truncate(MAX_SDU_LEN);

        let pong = Record::new(ping.addr, MAX_TTL, payload);

        if let Err(e) = stream.send(&pong.encode()) {
            tracing::warn!("Failed to send pong: {e}");
        }
    }
}
