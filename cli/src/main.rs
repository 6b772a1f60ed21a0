//! Ballot CLI: inspect the election contract, register and vote.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use ballot_session::{SessionConfig, SessionOrchestrator, SessionStatus};
use ballot_types::{CandidateSnapshot, NetworkId};
use ballot_utils::{short_address, vote_share, LogFormat};
use clap::Parser;

/// How often `watch` reloads the candidate list.
const WATCH_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "ballot", about = "Decentralized election client")]
struct Cli {
    /// Network the contract lives on: "mainnet", "sepolia", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "BALLOT_NETWORK")]
    network: Option<String>,

    /// API key for the hosted ledger endpoint.
    #[arg(long, env = "BALLOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Explicit ledger JSON-RPC endpoint (overrides network + API key).
    #[arg(long, env = "BALLOT_RPC_URL")]
    rpc_url: Option<String>,

    /// Wallet / signer endpoint. Without one the client is read-only.
    #[arg(long, env = "BALLOT_WALLET_URL")]
    wallet_url: Option<String>,

    /// Election contract address.
    #[arg(long, env = "BALLOT_CONTRACT")]
    contract: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show wallet, contract and candidate-data status.
    Status,
    /// List registered candidates and their votes.
    Candidates,
    /// Register the connected account as a candidate.
    Register,
    /// Vote for a candidate by id.
    Vote {
        /// Candidate id, as listed by `candidates`.
        id: String,
    },
    /// Print candidate updates and notifications until interrupted.
    Watch,
}

impl Cli {
    /// Merge file settings (if any) with flags and environment.
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(network) = &self.network {
            config.network = network
                .parse::<NetworkId>()
                .with_context(|| format!("invalid --network {network}"))?;
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(url) = &self.rpc_url {
            config.rpc_url = Some(url.clone());
        }
        if let Some(url) = &self.wallet_url {
            config.wallet_url = Some(url.clone());
        }
        if let Some(address) = &self.contract {
            config.contract_address = address.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

fn print_status(status: &SessionStatus) {
    println!("wallet:    {}", status.wallet);
    println!("contract:  {}", status.contract);
    println!("data:      {}", status.data);
    println!("ready:     {}", if status.ready { "yes" } else { "no" });
}

fn print_candidates(snapshot: &CandidateSnapshot) {
    if snapshot.is_empty() {
        println!("no candidates registered");
        return;
    }
    let total = snapshot.total_votes();
    let leader = snapshot.leader().map(|c| c.candidate_id);
    println!("{:>4}  {:<14}  {:>8}  {:>7}", "id", "address", "votes", "share");
    for c in &snapshot.candidates {
        println!(
            "{:>4}  {:<14}  {:>8}  {:>7}{}",
            c.candidate_id,
            short_address(c.candidate_address.as_str()),
            c.votes,
            vote_share(c.votes, total),
            if leader == Some(c.candidate_id) && c.votes > 0 { "  *" } else { "" },
        );
    }
    println!("total votes: {total}");
}

async fn watch(session: &SessionOrchestrator) -> anyhow::Result<()> {
    let mut snapshots = session.subscribe_snapshot();
    let mut notifications = session.subscribe();
    print_candidates(&snapshots.borrow_and_update());

    let mut ticker = tokio::time::interval(WATCH_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Failures arrive on the notification stream.
                let _ = session.refresh().await;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if !snapshot.is_loading {
                    print_candidates(&snapshot);
                }
            }
            notification = notifications.recv() => match notification {
                Ok(n) => println!("{n}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.session_config()?;
    ballot_utils::init_logging(config.log_format, &config.log_level);

    tracing::info!(
        network = config.network.as_str(),
        chain_id = config.network.chain_id(),
        contract = %config.contract_address,
        read_only = config.wallet_url.is_none(),
        "ballot client starting"
    );

    let session = SessionOrchestrator::from_config(&config)?;
    let status = session.start().await;

    let result = match cli.command {
        Command::Status => {
            print_status(&status);
            Ok(())
        }
        Command::Candidates => {
            print_candidates(&session.snapshot());
            Ok(())
        }
        Command::Register => session
            .register()
            .await
            .map(|tx| println!("Candidate Registered Successfully ({tx})"))
            .context("registration failed"),
        Command::Vote { id } => session
            .vote_for(&id)
            .await
            .map(|tx| println!("Vote Cast Successfully ({tx})"))
            .context("vote failed"),
        Command::Watch => watch(&session).await,
    };

    session.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "ballot",
            "--network",
            "dev",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--log-format",
            "json",
            "vote",
            "2",
        ])
        .unwrap();
        let config = cli.session_config().unwrap();
        assert_eq!(config.network, NetworkId::Dev);
        assert_eq!(config.rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.gas_limit, 300_000);
        assert!(matches!(cli.command, Command::Vote { ref id } if id == "2"));
    }

    #[test]
    fn unknown_network_is_rejected() {
        let cli = Cli::try_parse_from(["ballot", "--network", "moon", "status"]).unwrap();
        assert!(cli.session_config().is_err());
    }
}
