use anyhow::{Context as _, Result};
use clap::Parser;
use mipd::{Daemon, Eventloop};
use raw_link::{RawLink, enumerate_interfaces};
use seqpacket::SeqPacketListener;
use std::convert::Infallible;
use std::future::poll_fn;
use std::path::PathBuf;
use std::process::ExitCode;

/// The MIP daemon: moves MIP packets between the raw link and local
/// applications, resolving link addresses and next hops as it goes.
#[derive(Parser, Debug)]
#[command(name = "mipd")]
struct Cli {
    /// Enable debug logging.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Path of the Unix socket used to interface with upper layers.
    socket_path: PathBuf,

    /// MIP address of this node (255 is reserved for broadcast).
    #[arg(value_parser = clap::value_parser!(u8).range(0..=254))]
    mip_address: u8,
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
    let interfaces = enumerate_interfaces()?;

    let link = RawLink::open(interfaces)
        .context("Failed to open raw MIP socket (needs CAP_NET_RAW)")?;
    let listener = SeqPacketListener::bind(&cli.socket_path).with_context(|| {
        format!(
            "Failed to bind upper-layer socket at {}",
            cli.socket_path.display()
        )
    })?;

    tracing::info!(
        mip_addr = cli.mip_address,
        socket = %cli.socket_path.display(),
        num_interfaces = link.interfaces().len(),
        "MIP daemon running"
    );

    let mut eventloop = Eventloop::new(link, listener, Daemon::new(cli.mip_address));

    poll_fn(|cx| eventloop.poll(cx)).await
}
