use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "escudos",
    about = "Escudos credit ledger: issue grants, inspect balances and history",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Grant log file [default: the config's data_path, else escudos.ledger]
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// TOML config file, shared with `serve` (expiry windows, sync mode)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceArg {
    Manual,
    Subscription,
}

#[derive(Subcommand)]
pub enum Command {
    /// Credit a user
    Issue(IssueArgs),
    /// Show a user's spendable balance
    Balance(BalanceArgs),
    /// Show a user's grants, newest first
    History(HistoryArgs),
    /// Check whether a payment event was already applied
    Event(EventArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct IssueArgs {
    #[arg(long)]
    pub user: String,
    #[arg(long, allow_negative_numbers = true)]
    pub amount: i64,
    #[arg(long, value_enum, default_value = "manual")]
    pub source: SourceArg,
    /// Payment-provider event id (idempotency key)
    #[arg(long)]
    pub event: Option<String>,
}

#[derive(Args)]
pub struct BalanceArgs {
    #[arg(long)]
    pub user: String,
    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub user: String,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct EventArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_issue_manual() {
        let cli = Cli::try_parse_from(["escudos", "issue", "--user", "alice", "--amount", "10"]).unwrap();
        if let Command::Issue(args) = cli.command {
            assert_eq!(args.user, "alice");
            assert_eq!(args.amount, 10);
            assert_eq!(args.source, SourceArg::Manual);
            assert!(args.event.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_issue_subscription() {
        let cli = Cli::try_parse_from([
            "escudos", "issue", "--user", "alice", "--amount", "50",
            "--source", "subscription", "--event", "evt_1",
        ])
        .unwrap();
        if let Command::Issue(args) = cli.command {
            assert_eq!(args.source, SourceArg::Subscription);
            assert_eq!(args.event, Some("evt_1".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_negative_amount() {
        let cli = Cli::try_parse_from(["escudos", "issue", "--user", "a", "--amount", "-5"]).unwrap();
        if let Command::Issue(args) = cli.command {
            assert_eq!(args.amount, -5);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_unknown_source_fails() {
        assert!(Cli::try_parse_from([
            "escudos", "issue", "--user", "a", "--amount", "1", "--source", "gift",
        ])
        .is_err());
    }

    #[test]
    fn parse_balance_at() {
        let cli = Cli::try_parse_from([
            "escudos", "balance", "--user", "alice", "--at", "2025-02-01T00:00:00Z",
        ])
        .unwrap();
        if let Command::Balance(args) = cli.command {
            assert_eq!(args.at.unwrap().to_rfc3339(), "2025-02-01T00:00:00+00:00");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_history_limit() {
        let cli = Cli::try_parse_from(["escudos", "history", "--user", "alice", "-n", "5"]).unwrap();
        if let Command::History(args) = cli.command {
            assert_eq!(args.limit, Some(5));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["escudos", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".into()));
        } else { panic!("wrong command"); }
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "escudos", "--verbose", "--format", "json", "--data", "/tmp/x.ledger", "event", "evt_1",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/x.ledger")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "escudos", "issue", "--user", "a", "--amount", "1", "--config", "escudos.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("escudos.toml")));
    }
}
