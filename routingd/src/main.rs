use anyhow::{Context as _, Result, bail};
use clap::Parser;
use mip_wire::{Record, SduType};
use routingd::{HELLO_INTERVAL, HELLO_TIMEOUT, Router};
use seqpacket::SeqPacketStream;
use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};

/// The routing daemon: maintains a distance-vector routing table and
/// answers the MIP daemon's next-hop lookups.
#[derive(Parser, Debug)]
#[command(name = "routingd")]
struct Cli {
    /// Enable debug logging.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Path of the Unix socket of the local MIP daemon.
    socket_path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[expect(clippy::print_stderr, reason = "No logger has been set up yet")]
    if let Err(e) = mip_logging::setup(cli.debug) {
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
        .send(&[SduType::Routing as u8])
        .context("Failed to identify with MIP daemon")?;

    tracing::info!(socket = %cli.socket_path.display(), "Routing daemon running");

    let mut router = Router::default();

    // The first tick fires immediately, announcing us right away.
    let mut hello = interval(HELLO_INTERVAL);
    hello.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut timeout = interval_at(Instant::now() + HELLO_TIMEOUT, HELLO_TIMEOUT);
    timeout.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buf = [0u8; 1024];

    loop {
        tokio::select! {
            result = stream.recv(&mut buf) => {
                let len = result.context("Failed to read from MIP daemon")?;

                if len == 0 {
                    bail!("MIP daemon closed the connection");
                }

                match Record::decode(&buf[..len]) {
                    Ok(record) => router.handle_record(record),
                    Err(e) => tracing::debug!("Dropping undecodable record: {e}"),
                }
            }
            _ = hello.tick() => router.handle_hello_tick(),
            _ = timeout.tick() => router.handle_timeout_tick(),
        }

        while let Some(record) = router.next_record() {
            if let Err(e) = stream.send(&record.encode()) {
                tracing::warn!("Failed to send to MIP daemon: {e}");
            }
        }
    }
}
