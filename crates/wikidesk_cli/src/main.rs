//! Command-line entry point for store maintenance.
//!
//! # Responsibility
//! - Open the store from config, env and flags.
//! - Expose stats, search and backup management.

use anyhow::{Context, Result};
use clap::Parser;
use uuid::Uuid;
use wikidesk_core::{init_logging, SearchQuery, Wiki, WikiConfig};

mod args;
use args::{BackupCommands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WikiConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if let Some(dir) = config.logging.dir.as_deref() {
        init_logging(&config.logging.level, dir)?;
    }

    if let Commands::Ping = cli.command {
        println!("wikidesk_core ping={}", wikidesk_core::ping());
        println!("wikidesk_core version={}", wikidesk_core::core_version());
        return Ok(());
    }

    let mut wiki = Wiki::from_config(&config).context("failed to open store")?;
    log::info!("event=cli_start module=cli status=ok command={:?}", cli.command);

    match cli.command {
        Commands::Ping => {}
        Commands::Stats => {
            let stats = wiki.stats()?;
            println!("folders     {}", stats.folders);
            println!("pages       {}", stats.pages);
            println!("media       {}", stats.media);
            println!("ctfs        {}", stats.ctfs);
            println!("categories  {}", stats.categories);
            println!("backups     {}", stats.backups);
        }
        Commands::Search { text, limit } => {
            let mut query = SearchQuery::new(text);
            query.limit = limit;
            let hits = wiki.search_pages(&query)?;
            if hits.is_empty() {
                println!("no matches");
            }
            for hit in hits {
                println!("{}  {}  {}", hit.slug, hit.title, hit.snippet);
            }
        }
        Commands::Backup(command) => run_backup(&mut wiki, command)?,
    }
    Ok(())
}

fn run_backup(wiki: &mut Wiki, command: BackupCommands) -> Result<()> {
    match command {
        BackupCommands::Create { name } => {
            let summary = wiki.create_backup(&name)?;
            println!("created {} ({} pages)", summary.id, summary.counts.pages);
        }
        BackupCommands::List => {
            for summary in wiki.list_backups()? {
                println!(
                    "{}  {}  created_at={}  pages={} folders={} media={} ctfs={} categories={}",
                    summary.id,
                    summary.name,
                    summary.created_at,
                    summary.counts.pages,
                    summary.counts.folders,
                    summary.counts.media,
                    summary.counts.ctfs,
                    summary.counts.categories
                );
            }
        }
        BackupCommands::Export { id, out } => {
            let json = wiki.export_backup(parse_id(&id)?)?;
            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        BackupCommands::Import { file, restore } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = wiki.import_backup(&json)?;
            println!("imported {} as {}", summary.name, summary.id);
            if restore {
                let counts = wiki.restore_backup(summary.id)?;
                println!("restored {} pages", counts.pages);
            }
        }
        BackupCommands::Restore { id } => {
            let counts = wiki.restore_backup(parse_id(&id)?)?;
            println!(
                "restored pages={} folders={} media={} ctfs={} categories={}",
                counts.pages, counts.folders, counts.media, counts.ctfs, counts.categories
            );
        }
    }
    Ok(())
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).with_context(|| format!("invalid backup id `{value}`"))
}
