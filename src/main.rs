// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use novellama::app_config::{self, Config};
use novellama::context::{SectionKind, TranslationRequest};
use novellama::database::{ChapterRepository, DatabaseConnection, NovelRecord, ReferenceRecord, Repository};
use novellama::export::{export_novel, write_export};
use novellama::reorder::ReorderQueue;
use novellama::tokenizer::TokenizerAdapter;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List novels in display order
    Novels,

    /// Create a novel
    AddNovel {
        /// Novel title
        title: String,

        /// Source language code (defaults to the config)
        #[arg(short, long)]
        source_language: Option<String>,

        /// Target language code (defaults to the config)
        #[arg(short, long)]
        target_language: Option<String>,

        /// System prompt file for this novel
        #[arg(long, value_name = "FILE")]
        system_prompt: Option<PathBuf>,

        /// Where the raw chapters come from
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Attach a reference (glossary, character sheet...) to a novel
    AddReference {
        novel_id: String,

        /// Reference title
        #[arg(short, long)]
        title: String,

        /// File with the reference content
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Rewrite the novel list order
    Reorder {
        /// Every novel id in the new order
        #[arg(required = true)]
        novel_ids: Vec<String>,
    },

    /// List the chapters of a novel
    Chapters {
        novel_id: String,

        #[arg(long)]
        start: Option<i64>,

        #[arg(long)]
        end: Option<i64>,
    },

    /// List the revisions of a chapter
    Revisions { novel_id: String, number: i64 },

    /// Copy a revision back into its chapter
    Restore {
        novel_id: String,
        number: i64,
        revision_id: i64,
    },

    /// Delete a single revision
    DeleteRevision {
        novel_id: String,
        number: i64,
        revision_id: i64,
    },

    /// Delete a chapter with its revisions and quality check
    DeleteChapter { novel_id: String, number: i64 },

    /// Export a chapter range as plain text
    Export {
        novel_id: String,

        #[arg(long)]
        start: Option<i64>,

        #[arg(long)]
        end: Option<i64>,

        /// Directory the export is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Assemble the request for a chapter without sending it
    Plan {
        novel_id: String,

        /// Chapter number the source belongs to
        number: i64,

        /// File with the chapter source text
        #[arg(value_name = "SOURCE_FILE")]
        source_file: PathBuf,

        /// Print the assembled messages
        #[arg(long)]
        show_messages: bool,
    },

    /// Score a stored translation with the offline quality scorer
    Review {
        novel_id: String,

        number: i64,
    },

    /// Show database statistics
    Stats,

    /// Generate shell completions for novellama
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// novellama - chapter-by-chapter novel translation with LLMs
#[derive(Parser, Debug)]
#[command(name = "novellama")]
#[command(version)]
#[command(about = "Manage novel translations and their context")]
#[command(long_about = "novellama stores novels, their references and translated chapters, and assembles
translation requests that fit the model's token budget.

EXAMPLES:
    novellama add-novel \"My Novel\" -s ja -t en   # Create a novel
    novellama add-reference <ID> -t Names names.txt
    novellama plan <ID> 12 chapter12.txt          # Show what would be sent for chapter 12
    novellama export <ID> --start 1 --end 10      # Export chapters 1 to 10
    novellama completions bash > novellama.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. MAX_TOKENS, MODEL_NAME and MAX_CONTEXT_MESSAGES
    override the file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "31",
            Level::Warn => "33",
            Level::Info => "32",
            Level::Debug => "36",
            Level::Trace => "35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[1;{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "novellama", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let database_path = match &cli.database {
        Some(path) => path.clone(),
        None => config.resolved_database_path()?,
    };
    debug!("Using database {:?}", database_path);
    let repository = Repository::new(DatabaseConnection::open(Some(database_path.as_path()))?);

    run_command(cli.command, &config, &repository).await
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    if !config_path.exists() {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);
    }
    let mut config = Config::load_or_create(config_path)?;
    config.apply_env_overrides()?;

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", cli.config_path))?;
    Ok(config)
}

async fn require_novel(repository: &Repository, novel_id: &str) -> Result<NovelRecord> {
    repository
        .get_novel(novel_id)
        .await?
        .ok_or_else(|| anyhow!("Novel not found: {}", novel_id))
}

async fn run_command(command: Commands, config: &Config, repository: &Repository) -> Result<()> {
    match command {
        Commands::Novels => {
            let novels = repository.list_novels().await?;
            if novels.is_empty() {
                println!("No novels yet");
            }
            for novel in novels {
                println!(
                    "{}  {}  [{} -> {}]  {} chapters",
                    novel.id, novel.title, novel.source_language, novel.target_language, novel.chapter_count
                );
            }
        }
        Commands::AddNovel {
            title,
            source_language,
            target_language,
            system_prompt,
            source_url,
        } => {
            let source_language = source_language.unwrap_or_else(|| config.source_language.clone());
            let target_language = target_language.unwrap_or_else(|| config.target_language.clone());
            novellama::get_language_name(&source_language)?;
            novellama::get_language_name(&target_language)?;

            let prompt = match system_prompt {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read system prompt: {:?}", path))?,
                None => config.system_prompt.clone(),
            };
            let mut novel = NovelRecord::new(&title, &source_language, &target_language).with_system_prompt(&prompt);
            if let Some(template) = &config.translation_template {
                novel = novel.with_translation_template(template);
            }
            if let Some(url) = &source_url {
                novel = novel.with_source_url(url);
            }

            let novel = repository.create_novel(&novel).await?;
            info!("Created novel '{}'", novel.title);
            println!("{}", novel.id);
        }
        Commands::AddReference { novel_id, title, file } => {
            require_novel(repository, &novel_id).await?;
            let content =
                std::fs::read_to_string(&file).with_context(|| format!("Failed to read reference: {:?}", file))?;
            let tokenizer = TokenizerAdapter::heuristic(&config.model_name);

            let mut reference = ReferenceRecord::new(&novel_id, &title, &content);
            let wrapped = novellama::context::templates::wrap_reference(1, &reference);
            reference.token_count = Some(tokenizer.count(&wrapped).await as i64);
            repository.add_reference(&reference).await?;
            println!("{} ({} tokens)", reference.id, reference.token_count.unwrap_or_default());
        }
        Commands::Reorder { novel_ids } => {
            let queue = ReorderQueue::start(Arc::new(repository.clone()));
            let result = queue.submit(novel_ids).await;
            queue.shutdown().await;
            result?;
            info!("Novel order updated");
        }
        Commands::Chapters { novel_id, start, end } => {
            require_novel(repository, &novel_id).await?;
            for chapter in repository.list_chapters(&novel_id, start, end).await? {
                let status = match &chapter.quality_check {
                    Some(check) => check.to_string(),
                    None if chapter.is_translated() => "translated".to_string(),
                    None => "untranslated".to_string(),
                };
                println!("{:>5}  {}  ({})", chapter.number, chapter.title, status);
            }
        }
        Commands::Revisions { novel_id, number } => {
            for revision in repository.list_revisions(&novel_id, number).await? {
                println!(
                    "{:>5}  {}  {} chars",
                    revision.id,
                    revision.created_at,
                    revision.translated_text.chars().count()
                );
            }
        }
        Commands::Restore {
            novel_id,
            number,
            revision_id,
        } => match repository.restore_revision(&novel_id, number, revision_id).await? {
            Some(chapter) => info!("Restored revision {} into chapter {}", revision_id, chapter.number),
            None => return Err(anyhow!("Revision {} of chapter {} not found", revision_id, number)),
        },
        Commands::DeleteRevision {
            novel_id,
            number,
            revision_id,
        } => {
            if !repository.delete_revision(&novel_id, number, revision_id).await? {
                return Err(anyhow!("Revision {} of chapter {} not found", revision_id, number));
            }
            info!("Deleted revision {}", revision_id);
        }
        Commands::DeleteChapter { novel_id, number } => {
            if !repository.delete_chapter(&novel_id, number).await? {
                return Err(anyhow!("Chapter {} not found", number));
            }
            info!("Deleted chapter {}", number);
        }
        Commands::Export {
            novel_id,
            start,
            end,
            output_dir,
        } => {
            let export = export_novel(repository, &novel_id, start, end).await?;
            let path = write_export(&output_dir, &export)?;
            println!("{}", path.display());
        }
        Commands::Plan {
            novel_id,
            number,
            source_file,
            show_messages,
        } => {
            let novel = require_novel(repository, &novel_id).await?;
            let source = std::fs::read_to_string(&source_file)
                .with_context(|| format!("Failed to read chapter source: {:?}", source_file))?;
            let references = repository.list_references(&novel_id).await?;
            let prior_chapters = repository
                .recent_chapters(&novel_id, number, config.context_chapters)
                .await?;

            let builder = config.request_builder(TokenizerAdapter::heuristic(&config.model_name));
            let request = TranslationRequest::for_novel(&novel, &source)
                .with_references(references)
                .with_prior_chapters(prior_chapters);
            let context = builder.build(&request).await?;

            println!("Budget: {} tokens, using {}", context.budget, context.total_tokens);
            for kind in SectionKind::ALL {
                println!("  {:<14} {:>7}", kind.to_string(), context.section_tokens.get(kind));
            }
            for dropped in &context.dropped {
                println!("  dropped {} from {} ({} tokens)", dropped.label, dropped.section, dropped.tokens);
            }
            if show_messages {
                for message in &context.messages {
                    println!("\n[{}]\n{}", message.role, message.content);
                }
            }
        }
        Commands::Review { novel_id, number } => {
            let novel = require_novel(repository, &novel_id).await?;
            let chapter = repository
                .get_chapter(&novel_id, number)
                .await?
                .with_context(|| format!("Chapter {} not found in '{}'", number, novel.title))?;
            if !chapter.is_translated() {
                return Err(anyhow!("Chapter {} has no translation yet", number));
            }

            let quality = config.quality_loop();
            match quality
                .evaluate(
                    &chapter.source_text,
                    &chapter.translated_text,
                    &novel.source_language,
                    &novel.target_language,
                )
                .await
            {
                Some(check) => println!("Chapter {}: {}", number, check),
                None => println!("Quality checks are disabled in the configuration"),
            }
            if let Some(stored) = &chapter.quality_check {
                println!("Stored verdict: {}", stored);
            }
        }
        Commands::Stats => {
            println!("{}", repository.stats().await?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
