//! `rknow` - CLI for restaurant-knowledge
//!
//! Runs the web server and offers a few inspection commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use restaurant_knowledge::cli::{Cli, Command, ConfigCommand, ListCommand, ServeCommand};
use restaurant_knowledge::storage::open_store;
use restaurant_knowledge::{init_logging, Config, Record, RecordService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        // Validation reports errors itself; it must not fail on load.
        Command::Config(ConfigCommand::Validate { file }) => {
            handle_validate(file.or(cli.config));
            Ok(())
        }
        Command::Config(ConfigCommand::Path) => {
            println!("{}", Config::default_config_path().display());
            Ok(())
        }
        command => {
            let config = Config::load_from(cli.config.clone())
                .context("failed to load configuration")?;
            match command {
                Command::Serve(serve) => handle_serve(config, serve).await,
                Command::List(list) => handle_list(&config, &list).await,
                Command::Config(ConfigCommand::Show { json }) => handle_show(&config, json),
                Command::Config(_) => Ok(()),
            }
        }
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = cmd.bind {
        config.server.bind = bind;
    }
    let addr = config.bind_addr()?;
    restaurant_knowledge::server::serve(&config, addr)
        .await
        .context("server failed")
}

async fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let service = RecordService::new(open_store(&config.storage_mode())?);
    let records = service
        .list()
        .await
        .with_context(|| format!("failed to read {}", service.describe()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No restaurants in {}.", service.describe());
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    println!();
    println!("{} restaurant(s) in {}", records.len(), service.describe());
    Ok(())
}

fn print_record(record: &Record) {
    println!(
        "{:<14} {}  [{}]  {} / {}",
        record.id, record.name, record.category, record.nearest_station, record.address
    );
    let mut details = vec![format!("by {}", record.author)];
    if record.rating > 0.0 {
        details.push(format!("rating {}", record.rating));
    }
    if !record.budget.is_empty() {
        details.push(record.budget.clone());
    }
    if let Some(url) = record.preview_url() {
        details.push(url.to_string());
    }
    println!("{:<14} {}", "", details.join(", "));
}

fn handle_show(config: &Config, json: bool) -> anyhow::Result<()> {
    let shown = config.redacted();
    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Server]");
    println!("  Bind:               {}", shown.server.bind);
    println!();
    println!("[Storage]");
    println!("  Mode:               {}", config.storage_mode());
    println!("  Local data path:    {}", shown.storage.data_path.display());
    println!();
    println!("[Remote]");
    println!("  Owner:              {}", shown.remote.owner);
    println!("  Repo:               {}", shown.remote.repo);
    println!("  Path:               {}", shown.remote.path);
    println!(
        "  Token:              {}",
        shown.remote.token.as_deref().unwrap_or("(not set)")
    );
    println!("  API base:           {}", shown.remote.api_base);
    println!("  Timeout (secs):     {}", shown.remote.timeout_secs);
    println!();
    println!("[Thumbnail]");
    println!("  User agent:         {}", shown.thumbnail.user_agent);
    println!("  Timeout (secs):     {}", shown.thumbnail.timeout_secs);
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(config) => {
            println!("Configuration is valid.");
            println!("Storage: {}", config.storage_mode());
        }
        Err(e) => println!("Configuration error: {e}"),
    }
}
