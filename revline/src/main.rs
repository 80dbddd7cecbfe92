//! revline: version-tracked incremental code analysis.
//!
//! Entry point for the `revline` binary. Loads config once at startup,
//! initializes tracing, opens the WAL-mode SQLite database before the
//! first command runs, and dispatches to the pipeline.

use clap::{Parser, Subcommand};
use revline::analyzer::FileKind;
use revline::blob::{BlobStore, FsBlobStore};
use revline::cancel::CancelToken;
use revline::config::{config_path, Config};
use revline::pipeline::{IncrementalStatus, ReviewPipeline};
use revline::PipelineError;

#[derive(Parser)]
#[command(name = "revline", about = "Version-tracked incremental code analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new version of a blob if its content changed.
    Save {
        /// Blob key, e.g. `user/folder/file.js`.
        key: String,
    },
    /// Run a full analysis of a blob and record it against the latest version.
    Analyze { key: String },
    /// Run an incremental review of a blob against its latest stored version.
    Review { key: String },
    /// Analyze every blob under a key prefix.
    Folder { prefix: String },
    /// Show the stored version history of a file key.
    History { key: String },
    /// Show the line diff between two stored version ids.
    Diff { version_a: String, version_b: String },
}

fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn read_utf8(blobs: &FsBlobStore, key: &str) -> Result<String, PipelineError> {
    let bytes = blobs.read(key)?;
    String::from_utf8(bytes)
        .map_err(|_| PipelineError::InvalidInput(format!("blob {key} is not valid UTF-8")))
}

async fn run(cli: Cli, config: Config) -> Result<(), PipelineError> {
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent).map_err(PipelineError::Blob)?;
    }
    let conn = revline_core::db::open_db(&config.db_path).await?;
    let pipeline = ReviewPipeline::new(conn).with_workers(config.worker_threads);
    let blobs = FsBlobStore::new(&config.blob_root);
    let cancel = CancelToken::new();

    match cli.command {
        Command::Save { key } => {
            let content = read_utf8(&blobs, &key)?;
            let out = pipeline
                .store_version_if_changed(&key, file_name_of(&key), &content)
                .await?;
            if out.created {
                println!("{key}: stored version {}", out.version_number);
            } else {
                println!("{key}: unchanged (version {})", out.version_number);
            }
        }
        Command::Analyze { key } => {
            let content = read_utf8(&blobs, &key)?;
            let result = pipeline.run_full_analysis(&content, file_name_of(&key), &cancel)?;
            print_result(&key, &result);
            // Attach the review to a stored version when one exists.
            match pipeline.record_full_review(&key, &result).await {
                Ok(review) => println!("recorded review {}", review.id),
                Err(PipelineError::Store(revline_core::StoreError::NotFound(_))) => {
                    println!("(no stored version; review not recorded; run `save` first)");
                }
                Err(e) => return Err(e),
            }
        }
        Command::Review { key } => {
            let content = read_utf8(&blobs, &key)?;
            let out = pipeline
                .run_incremental_analysis(&key, file_name_of(&key), &content, &cancel)
                .await?;
            match out.status {
                IncrementalStatus::RequiresFullReview => {
                    println!("{key}: no stored version, full review required");
                }
                IncrementalStatus::NoChanges => println!("{key}: no changes"),
                IncrementalStatus::Reviewed => {
                    println!(
                        "{key}: {} changed lines (+{} -{}), {} issues",
                        out.metrics.lines_changed,
                        out.metrics.lines_added,
                        out.metrics.lines_deleted,
                        out.metrics.issues_found
                    );
                    for issue in &out.issues {
                        println!(
                            "  {:>4}  {:8}  [{}] {} ({})",
                            issue.line,
                            issue.severity.as_str(),
                            issue.category.as_str(),
                            issue.message,
                            issue.suggestion
                        );
                    }
                }
            }
        }
        Command::Folder { prefix } => {
            let results = pipeline.analyze_folder(&blobs, &prefix, &cancel)?;
            for file in &results {
                println!(
                    "{}: {} issues, overall {}",
                    file.key,
                    file.result.issues.len(),
                    file.result.scores.overall
                );
            }
        }
        Command::History { key } => {
            let history = pipeline.get_history(&key).await?;
            println!(
                "{key}: {} versions, {} bytes total",
                history.version_count, history.total_bytes
            );
            for v in &history.versions {
                println!(
                    "  v{:<4} {}  {} bytes  {}",
                    v.version_number,
                    &v.fingerprint[..12.min(v.fingerprint.len())],
                    v.size_bytes,
                    v.created_at
                );
            }
        }
        Command::Diff { version_a, version_b } => {
            let (entries, stats) = pipeline.get_diff(&version_a, &version_b).await?;
            println!("+{} -{} ~{}", stats.added, stats.deleted, stats.modified);
            for e in &entries {
                match e.kind {
                    revline::diff::DiffKind::Added => {
                        println!("{:>4} + {}", e.line, e.new_text.as_deref().unwrap_or(""))
                    }
                    revline::diff::DiffKind::Deleted => {
                        println!("{:>4} - {}", e.line, e.old_text.as_deref().unwrap_or(""))
                    }
                    revline::diff::DiffKind::Modified => {
                        println!("{:>4} ~ {}", e.line, e.new_text.as_deref().unwrap_or(""))
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_result(key: &str, result: &revline::analyzer::AnalysisResult) {
    let s = &result.scores;
    println!(
        "{key} ({:?}): overall {} (style {} security {} architecture {} quality {} docs {})",
        FileKind::from_name(file_name_of(key)),
        s.overall,
        s.style,
        s.security,
        s.architecture,
        s.quality,
        s.documentation
    );
    for issue in &result.issues {
        println!(
            "  {:>4}  {:8}  [{}] {} ({})",
            issue.line,
            issue.severity.as_str(),
            issue.category.as_str(),
            issue.message,
            issue.suggestion
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&config_path());

    if let Err(e) = run(cli, config).await {
        eprintln!("revline: {} ({})", e, e.kind());
        std::process::exit(1);
    }
}
