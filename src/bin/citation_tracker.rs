use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;

use citation_tracker::archive::arxiv::ArxivClient;
use citation_tracker::auth::token_manager::TokenManager;
use citation_tracker::auth::token_store::{self, SecretKind};
use citation_tracker::config::{Config, interval_from_hours, load_config, resolve_db_path};
use citation_tracker::daemon::{DaemonConfig, run_daemon};
use citation_tracker::extract::extract_citation;
use citation_tracker::mail::decoders::decode_entities;
use citation_tracker::mail::imap_client::ImapMailbox;
use citation_tracker::pipeline::{Collaborators, Pipeline, PipelineSettings};
use citation_tracker::sink::notion::{NotionSchema, NotionStore};
use citation_tracker::store::repo::JournalRepository;
use citation_tracker::store::sqlite::SqliteJournal;
use citation_tracker::summarize::anthropic::AnthropicClient;

#[derive(Parser)]
#[command(name = "citation_tracker")]
#[command(about = "Summarize papers from citation alert emails into Notion", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/citation_tracker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process alerts now, then on every interval until Ctrl-C
    Daemon {
        /// Overrides poll_interval_hours from the config
        #[arg(long)]
        interval_hours: Option<u64>,
    },

    /// Process the currently unread alerts once
    RunOnce,

    /// Authorize mailbox access in the browser (OAuth PKCE)
    Login,

    /// Store a secret in the OS keyring (read from stdin)
    SetSecret {
        #[arg(long, value_enum)]
        name: SecretKind,
    },

    /// Show recent papers that were not stored
    Journal {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Find Notion databases by title to fill notion_database_id
    FindDatabase {
        #[arg(long)]
        query: String,
    },

    /// Run the extractor on a saved email body
    Extract { file: PathBuf },
}

/// Production collaborators built from config and secrets.
struct Services {
    mailbox: ImapMailbox,
    arxiv: ArxivClient,
    anthropic: AnthropicClient,
    notion: NotionStore,
    journal: SqliteJournal,
}

impl Services {
    fn build(cfg: &Config) -> Result<Self> {
        let tokens = TokenManager::from_config(cfg)?;
        let schema = NotionSchema {
            authors: cfg.authors_property.clone(),
            ..Default::default()
        };
        Ok(Self {
            mailbox: ImapMailbox::new(cfg.imap_server(), cfg.user_email()?, tokens),
            arxiv: ArxivClient::new()?,
            anthropic: AnthropicClient::new(
                token_store::require_secret(SecretKind::Anthropic, "")?,
                cfg.anthropic_model.clone(),
            )?,
            notion: NotionStore::new(
                token_store::require_secret(SecretKind::Notion, "")?,
                cfg.notion_database_id()?,
                schema,
            )?,
            journal: SqliteJournal::open(&resolve_db_path(cfg)?)?,
        })
    }

    fn pipeline(&self, cfg: &Config) -> Pipeline<'_> {
        let settings = PipelineSettings {
            sender: cfg.scholar_sender.clone(),
            max_messages: cfg.max_messages,
            fetch_retry: cfg.fetch_retry_policy(),
            summary_char_limit: cfg.summary_char_limit,
        };
        Pipeline::new(
            Collaborators {
                mail: &self.mailbox,
                archive: &self.arxiv,
                completion: &self.anthropic,
                store: &self.notion,
            },
            settings,
        )
        .with_journal(&self.journal)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let load = || load_config(cli.config.as_deref()).map_err(|e| anyhow!("Configuration error: {e}"));

    match cli.cmd {
        Command::Daemon { interval_hours } => {
            let cfg = load()?;
            let services = Services::build(&cfg)?;
            let interval = match interval_hours {
                Some(h) => interval_from_hours(h),
                None => cfg.poll_interval(),
            };
            run_daemon(services.pipeline(&cfg), DaemonConfig { interval })
        }

        Command::RunOnce => {
            let cfg = load()?;
            let services = Services::build(&cfg)?;
            let report = services.pipeline(&cfg).run_once();
            println!("{report:#?}");
            if report.fetch_failed {
                return Err(anyhow!("could not list unread alerts"));
            }
            Ok(())
        }

        Command::Login => {
            let cfg = load()?;
            TokenManager::from_config(&cfg)?.login()?;
            println!("Mailbox access authorized for {}", cfg.user_email()?);
            Ok(())
        }

        Command::SetSecret { name } => {
            let key = match name {
                SecretKind::OauthClient => load()?.client_id,
                SecretKind::RefreshToken => load()?.user_email()?,
                SecretKind::Notion | SecretKind::Anthropic => String::new(),
            };
            eprintln!("Paste secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_secret(name, &key, secret.trim())?;
            println!("Saved {name:?} secret");
            Ok(())
        }

        Command::Journal { limit } => {
            let cfg = load()?;
            let journal = SqliteJournal::open(&resolve_db_path(&cfg)?)?;
            for (outcome, n) in journal.counts()? {
                println!("{:<15} {n}", outcome.as_str());
            }
            println!();
            for e in journal.list_failures(limit)? {
                println!(
                    "{}  [{}] msg {}  seed: {}  title: {}  {}",
                    e.recorded_at.format("%Y-%m-%d %H:%M"),
                    e.outcome.as_str(),
                    e.message_id,
                    e.seed_paper,
                    e.title,
                    e.detail
                );
            }
            Ok(())
        }

        Command::FindDatabase { query } => {
            let notion = NotionStore::new(
                token_store::require_secret(SecretKind::Notion, "")?,
                "",
                NotionSchema::default(),
            )?;
            let found = notion.find_databases(&query)?;
            if found.is_empty() {
                println!("No databases matching '{query}' are shared with the integration");
            }
            for db in found {
                println!("{}: {}", db.title, db.id);
            }
            Ok(())
        }

        Command::Extract { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let citation = extract_citation(&decode_entities(&raw));
            match &citation.seed_paper_title {
                Some(seed) => println!("seed: {seed}"),
                None => println!("seed: (none)"),
            }
            for (i, title) in citation.citing_paper_titles.iter().enumerate() {
                println!("{:>3}. {title}", i + 1);
            }
            Ok(())
        }
    }
}
