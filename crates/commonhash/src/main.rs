use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use commonhash::core::ManifestError;
use commonhash::tls::{ChannelError, SelfSignedCert, DEFAULT_NAMES};
use commonhash::{PeerSession, SessionError};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, GenCertArgs, HashArgs, RunArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run(args, cli.json).await,
        Commands::Hash(args) => hash(args, cli.json),
        Commands::GenCert(args) => gen_cert(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}: {e}", phase(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs, json: bool) -> Result<()> {
    let report = PeerSession::new(args.peer_config())?.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for m in &report.client.intersection.matches {
        println!("{}  {}", m.digest.to_hex(), m.local_identifiers.join(", "));
    }
    println!("Common file count: {}", report.client.intersection.count);
    Ok(())
}

fn hash(args: HashArgs, json: bool) -> Result<()> {
    let manifest = commonhash::core::ManifestBuilder::new(args.scan.algorithm)
        .block_size(args.scan.block_size)
        .unreadable(args.scan.unreadable_policy())
        .build(&args.directory)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    for entry in &manifest {
        println!("{}  {}", entry.digest.to_hex(), entry.identifier);
    }
    Ok(())
}

fn gen_cert(args: GenCertArgs) -> Result<()> {
    let cert = if args.names.is_empty() {
        SelfSignedCert::generate(DEFAULT_NAMES)?
    } else {
        SelfSignedCert::generate(&args.names)?
    };
    cert.write(&args.cert, &args.key)?;
    println!("{}", args.cert.display());
    Ok(())
}

/// Phase label for the `error: <phase>: ...` line.
fn phase(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<SessionError>() {
        e.phase()
    } else if err.downcast_ref::<ManifestError>().is_some() {
        "hash"
    } else if err.downcast_ref::<ChannelError>().is_some() {
        "tls"
    } else {
        "output"
    }
}
