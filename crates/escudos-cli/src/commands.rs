use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use escudos_ledger::{IdempotencyGuard, IssueRequest, LedgerError, LedgerService};
use escudos_server::{EscudosServer, ServerConfig};
use escudos_store::FileGrantStore;
use escudos_types::{EventId, GrantSource, UserId};

use crate::cli::*;

type FileLedger = LedgerService<FileGrantStore>;

const DEFAULT_DATA_PATH: &str = "escudos.ledger";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format.clone();
    let config = load_config(cli.config.as_deref(), cli.data)?;
    match cli.command {
        Command::Issue(args) => cmd_issue(&open_ledger(&config)?, args, &format),
        Command::Balance(args) => cmd_balance(&open_ledger(&config)?, args, &format),
        Command::History(args) => cmd_history(&open_ledger(&config)?, args, &format),
        Command::Event(args) => cmd_event(&open_ledger(&config)?, args, &format),
        Command::Serve(args) => cmd_serve(config, args),
    }
}

/// Resolve the shared config: the TOML file when given, `--data` over its
/// `data_path`, and the default log file when neither names one.
fn load_config(path: Option<&Path>, data: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(data) = data {
        config.data_path = Some(data);
    }
    if config.data_path.is_none() {
        config.data_path = Some(PathBuf::from(DEFAULT_DATA_PATH));
    }
    config.validate()?;
    Ok(config)
}

fn data_path(config: &ServerConfig) -> &Path {
    config
        .data_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_DATA_PATH))
}

fn open_ledger(config: &ServerConfig) -> anyhow::Result<FileLedger> {
    let path = data_path(config);
    tracing::debug!(path = %path.display(), sync = ?config.sync, "opening ledger");
    let store = FileGrantStore::open(path, config.sync)
        .with_context(|| format!("opening grant log {}", path.display()))?;
    Ok(LedgerService::new(store, &config.ledger))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_issue(ledger: &FileLedger, args: IssueArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let source = match args.source {
        SourceArg::Manual => GrantSource::Manual,
        SourceArg::Subscription => GrantSource::Subscription,
    };
    let request = IssueRequest {
        user_id: UserId::new(args.user)?,
        amount: args.amount,
        source,
        source_event_id: args.event.map(EventId::new).transpose()?,
    };
    let issued = ledger.issue(request)?;

    if let OutputFormat::Json = format {
        return print_json(&issued);
    }

    let grant = issued.grant();
    if issued.was_replayed() {
        println!("{} Event already applied; no new credit", "=".yellow().bold());
    } else {
        println!("{} Grant issued", "✓".green().bold());
    }
    println!("  Grant:   {}", grant.id.to_string().yellow());
    println!("  User:    {}", grant.user_id.to_string().bold());
    println!("  Amount:  {}", grant.amount.to_string().green());
    println!("  Source:  {}", grant.source.to_string().cyan());
    match grant.expires_at {
        Some(at) => println!("  Expires: {}", at.to_rfc3339()),
        None => println!("  Expires: {}", "never".dimmed()),
    }
    if let Some(event) = &grant.source_event_id {
        println!("  Event:   {}", event.to_string().blue());
    }
    Ok(())
}

fn cmd_balance(ledger: &FileLedger, args: BalanceArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    if let Some(at) = args.at {
        let balance = ledger.balance_at(&user, at)?;
        return match format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "user_id": user,
                "balance": balance,
                "as_of": at,
            })),
            OutputFormat::Text => {
                println!("{} has {} escudos at {}", user.to_string().bold(), balance.to_string().green().bold(), at.to_rfc3339());
                Ok(())
            }
        };
    }

    let summary = ledger.balance_summary(&user)?;
    if let OutputFormat::Json = format {
        return print_json(&summary);
    }
    println!("{} has {} escudos", user.to_string().bold(), summary.balance.to_string().green().bold());
    if let Some(next) = summary.next_expiry {
        println!(
            "  {} expire on {}",
            summary.expiring_amount.to_string().yellow(),
            next.to_rfc3339()
        );
    }
    Ok(())
}

fn cmd_history(ledger: &FileLedger, args: HistoryArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let mut view = ledger.history_view(&user)?;
    if let Some(limit) = args.limit {
        view.entries.truncate(limit);
    }

    if let OutputFormat::Json = format {
        return print_json(&view);
    }
    if view.is_empty() {
        println!("No grants for {}.", user.to_string().bold());
        return Ok(());
    }
    for entry in &view.entries {
        let state = if entry.is_expired { "expired".red() } else { "active".green() };
        let expires = entry
            .expires_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".into());
        println!(
            "{}  {:>10}  {:<12}  {}  expires {}  [{}]",
            entry.id.short_id().yellow(),
            entry.amount,
            entry.source.to_string().cyan(),
            entry.issued_at.format("%Y-%m-%d"),
            expires,
            state
        );
    }
    Ok(())
}

fn cmd_event(ledger: &FileLedger, args: EventArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let event_id = EventId::new(args.id)?;
    let applied = match IdempotencyGuard::ensure_not_duplicate(ledger.store(), &event_id) {
        Ok(()) => false,
        Err(LedgerError::DuplicateEvent { .. }) => true,
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "event_id": event_id, "applied": applied })),
        OutputFormat::Text => {
            if applied {
                println!("Event {} {}", event_id.to_string().blue(), "already applied".yellow());
            } else {
                println!("Event {} {}", event_id.to_string().blue(), "not seen".green());
            }
            Ok(())
        }
    }
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    }

    println!(
        "Escudos server on {} (ledger: {})",
        config.bind_addr.to_string().bold(),
        data_path(&config).display()
    );
    let server = EscudosServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
