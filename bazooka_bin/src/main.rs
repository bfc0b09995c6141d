//! Runs a single scripted session against a local target node.
//!
//! The target is found through its data directory, its chain is served until it announces our
//! head and the attack script is played from there.
use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::*;
use ziggurat_bazooka::{
    chain::{encode_chain, generate_blocks, MemoryChain},
    session::{Session, SessionOutcome},
    setup::{
        bootstrap::PeerBootstrap, config::BazookaConfig, identity::resolve_target,
        script::AttackScript,
    },
};

/// An adversarial peer which syncs a node and then attacks it.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CmdArgs {
    /// Path to the configuration file, `bazooka.toml` in the working directory by default.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write a generated chain of this many blocks to the configured chain file and exit.
    #[arg(short = 'g', long, value_name = "BLOCKS")]
    generate_chain: Option<usize>,

    /// Enable tracing.
    #[arg(short = 't', long, default_value_t = false)]
    tracing: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CmdArgs::parse();

    if args.tracing {
        println!("Enabling tracing.");
        use tracing_subscriber::{fmt, EnvFilter};

        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    if let Some(len) = args.generate_chain {
        return match generate_chain(args.config, len) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Couldn't generate the chain: {e:?}.");
                ExitCode::FAILURE
            }
        };
    }

    match run(args).await {
        Ok(SessionOutcome::TerminateProcess) => {
            println!("Attack finished, terminating.");
            ExitCode::SUCCESS
        }
        Ok(SessionOutcome::ActionsExhausted) => {
            println!("Attack script ran out of actions.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("The session stopped: {e:?}.");
            ExitCode::FAILURE
        }
    }
}

fn generate_chain(config: Option<PathBuf>, len: usize) -> Result<()> {
    let config = BazookaConfig::load(config.as_deref()).context("loading configuration")?;
    let export = encode_chain(&generate_blocks(len))?;
    fs::write(&config.chain, export)
        .with_context(|| format!("writing chain to {}", config.chain.display()))?;
    println!("Wrote {} blocks to {}.", len, config.chain.display());

    Ok(())
}

async fn run(args: CmdArgs) -> Result<SessionOutcome> {
    let config = BazookaConfig::load(args.config.as_deref()).context("loading configuration")?;

    let target = resolve_target(&config.target_data_dir, config.target_port)
        .context("resolving the target")?;
    info!("target: {}", target);

    let chain = Arc::new(
        MemoryChain::load(config.network_id, &config.chain)
            .with_context(|| format!("loading chain from {}", config.chain.display()))?,
    );
    let script = AttackScript::load(&config.script, &chain)
        .with_context(|| format!("loading script from {}", config.script.display()))?;
    info!("loaded {} actions", script.actions().len());

    let session =
        Session::new(chain, script.spawn_feeder()).with_config(config.session_config());

    let outcome = PeerBootstrap::new(target).run(session).await?;

    Ok(outcome)
}
