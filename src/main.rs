mod config;
mod s3;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use walkdir::WalkDir;

use config::{Acl, RunConfig, stamped_prefix};
use s3::{FileEntry, ObjectStore, S3Client, Stats, UploadOutcome, empty_prefix, upload_all};

#[derive(Parser, Debug)]
#[command(
    name = "s3deploy",
    version = env!("CARGO_PKG_VERSION"),
    author = "Tyr Chen <tyr.chen@gmail.com>",
    about = "Deploy static build artifacts to an S3 bucket",
    long_about = "Uploads a directory (or single file) of distribution files to an S3 bucket, \
                  optionally emptying the destination prefix first. Large files are uploaded \
                  in concurrent multipart chunks. Credentials are read from a JSON config file \
                  with accessKeyId and secretAccessKey.",
    after_help = "Examples:\n  \
                  s3deploy my-bucket ./dist                    # Upload ./dist to the bucket root\n  \
                  s3deploy my-bucket ./dist --folder releases  # Upload under releases.YYYYMMDD/\n  \
                  s3deploy my-bucket ./dist --empty            # Delete existing objects first\n  \
                  s3deploy my-bucket ./dist --acl public-read  # Make uploaded files public\n\n\
                  BUCKET_NAME and DIST_PATH environment variables may stand in for the\n\
                  positional arguments."
)]
struct Cli {
    /// S3 bucket to deploy to (falls back to the BUCKET_NAME environment variable)
    bucket: Option<String>,

    /// File or directory holding the distribution files (falls back to DIST_PATH)
    dist_path: Option<PathBuf>,

    /// Empty the destination prefix in the bucket before uploading
    #[arg(long)]
    empty: bool,

    /// Destination key prefix inside the bucket
    #[arg(long, visible_aliases = ["dir", "directory"], default_value = "")]
    folder: String,

    /// Path to AWS config json file that includes accessKeyId & secretAccessKey
    #[arg(long, visible_alias = "cfg", default_value = "./AwsConfig.json")]
    config: PathBuf,

    /// Access permissions for the uploaded file(s)
    #[arg(long, visible_alias = "access", value_enum, default_value = "private")]
    acl: Acl,

    /// Add the current date to the bucket folder, format: yyyyMMdd
    #[arg(
        long,
        visible_alias = "date",
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    datestamp: bool,

    /// Part size in MB; files of at least this size use multipart upload
    #[arg(long, default_value_t = 5)]
    part_size: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    // Initialize tracing/logging with support for LOG_LEVEL from .env
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let bucket = cli.bucket.or_else(|| std::env::var("BUCKET_NAME").ok());
    let dist_path = cli
        .dist_path
        .or_else(|| std::env::var("DIST_PATH").ok().map(PathBuf::from));

    let (Some(bucket), Some(dist_path)) = (bucket, dist_path) else {
        eprintln!("Required parameters not set, please set BUCKET_NAME and DIST_PATH environment variables");
        eprintln!("Or pass them as arguments: 's3deploy <bucket name> <path to distribution files>'");
        eprintln!("Exiting...");
        std::process::exit(1);
    };

    let prefix = if cli.datestamp {
        stamped_prefix(&cli.folder, chrono::Local::now().date_naive())
    } else {
        cli.folder.clone()
    };

    let config = RunConfig::new(
        bucket,
        dist_path,
        prefix,
        cli.acl,
        cli.config,
        cli.empty,
        cli.part_size,
    )?;

    print_options(&config, cli.datestamp);

    let store = Arc::new(S3Client::new(config.clone()).await?);

    info!("Starting deploy process - bucket: {}", config.bucket);
    let start = Instant::now();

    let (stats, mut outcomes) = run_deploy(store, &config).await?;

    if stats.total == 0 {
        println!(
            "{}",
            style(format!(
                "No files found under {}",
                config.dist_path.display()
            ))
            .yellow()
        );
        return Ok(());
    }

    outcomes.sort_by(|a, b| a.relative().cmp(b.relative()));

    println!();
    for outcome in &outcomes {
        match outcome {
            UploadOutcome::Uploaded { relative } => {
                println!("{} {}", style("✓").green(), style(relative).green());
            }
            UploadOutcome::Failed { relative, error } => {
                println!(
                    "{} {} - {}",
                    style("✗").red(),
                    style(relative).red(),
                    style(error).red()
                );
            }
        }
    }

    print_summary(&stats, start.elapsed().as_secs_f64());

    if !stats.all_uploaded() {
        std::process::exit(1);
    }

    Ok(())
}

/// Drive one deploy run: enumerate, optionally clean the destination
/// prefix, then upload everything.
///
/// The source path is enumerated first so that a bad path fails before
/// any remote object is deleted.
async fn run_deploy<S>(store: Arc<S>, config: &RunConfig) -> Result<(Stats, Vec<UploadOutcome>)>
where
    S: ObjectStore + 'static,
{
    let entries = collect_entries(config)?;

    if config.empty_first {
        let deleted = empty_prefix(&*store, &config.prefix)
            .await
            .context("Failed to empty destination prefix; aborting before upload")?;
        println!(
            "{}",
            style(format!("🧹 Deleted {} existing objects", deleted)).dim()
        );
    }

    if entries.is_empty() {
        return Ok((Stats::default(), Vec::new()));
    }

    println!(
        "{}",
        style(format!(
            "⚡ Uploading {} files to s3://{}/{}",
            entries.len(),
            config.bucket,
            config.prefix
        ))
        .cyan()
        .bold()
    );

    Ok(upload_all(store, entries, config.threshold_mb).await)
}

/// Enumerate the files to upload: every regular file under a directory
/// source, or the single file itself.
fn collect_entries(config: &RunConfig) -> Result<Vec<FileEntry>> {
    let dist = &config.dist_path;

    if dist.is_file() {
        let name = dist
            .file_name()
            .context("Failed to get file name")?
            .to_string_lossy()
            .to_string();
        return Ok(vec![FileEntry {
            key: config.build_key(&name),
            local: dist.clone(),
            relative: name,
        }]);
    }

    if !dist.is_dir() {
        anyhow::bail!("Path does not exist: {}", dist.display());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dist) {
        let entry = entry
            .with_context(|| format!("Failed to read source directory: {}", dist.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dist)
            .context("Failed to strip source prefix")?
            .to_string_lossy()
            .to_string();
        entries.push(FileEntry {
            key: config.build_key(&relative),
            local: entry.into_path(),
            relative,
        });
    }

    Ok(entries)
}

fn print_options(config: &RunConfig, datestamp: bool) {
    println!("\n{}", style("Running S3 deploy").bold());
    println!("{}", style("*** Options ***").dim());
    println!("BUCKET_NAME (required) = {}", config.bucket);
    println!("DIST_PATH (required) = {}", config.dist_path.display());
    println!("AWS_CONFIG = {}", config.credentials_path.display());
    println!("EMPTY_BUCKET = {}", config.empty_first);
    println!("BUCKET_FOLDER = {}", config.prefix);
    println!("BUCKET_ACL = {}", config.acl.as_canned().as_str());
    println!("DATESTAMP_FOLDER = {}", datestamp);
    println!("PART_SIZE_MB = {}", config.threshold_mb);
}

fn print_summary(stats: &Stats, elapsed_secs: f64) {
    println!("\n{}", style("═".repeat(70)).dim());
    println!(
        "{}",
        style(format!(
            "#Files: {}, #Uploaded: {}, #Errors: {}",
            stats.total,
            stats.uploaded,
            stats.failed()
        ))
        .bold()
    );
    println!(
        "{}",
        style(format!("Finished in {:.2}s", elapsed_secs)).dim()
    );
}
