use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grep_worker::broker::RedisBroker;
use grep_worker::config::{GrepConfig, WorkerConfig};
use grep_worker::mount::LoopbackMounter;
use grep_worker::search::GrepSearcher;
use grep_worker::shutdown::install_shutdown_handler;
use grep_worker::task::{SearchRequest, SearchTask, Target};
use grep_worker::worker::Worker;

#[derive(Parser, Debug)]
#[command(name = "grep-worker")]
#[command(version)]
#[command(about = "Task-queue worker that runs grep over files and mounted disk images")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the worker loop against the task-queue broker
    Run(RunArgs),

    /// Execute a single search locally and print the report as JSON
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Broker connection string; falls back to REDIS_URL, then localhost
    #[arg(long)]
    broker_url: Option<String>,

    /// Queue to pop search requests from
    #[arg(long)]
    request_queue: Option<String>,

    /// Queue to publish search reports to
    #[arg(long)]
    result_queue: Option<String>,

    /// Directory to create image mount points under
    #[arg(long)]
    mount_root: Option<PathBuf>,

    /// Abort batches on the first per-target error, even for requests
    /// that do not set fail_fast themselves
    #[arg(long)]
    fail_fast: bool,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Search expression (POSIX extended regexp)
    #[arg(short, long)]
    pattern: String,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Lines of context around each match
    #[arg(short = 'C', long)]
    context: Option<u32>,

    /// Abort the batch on the first per-target error
    #[arg(long)]
    fail_fast: bool,

    /// Disk images to mount read-only and search
    #[arg(long = "image", value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Directory to create image mount points under
    #[arg(long, default_value = "/tmp/grep-worker/mounts")]
    mount_root: PathBuf,

    /// Files to search
    files: Vec<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn new_task(mount_root: PathBuf) -> SearchTask {
    SearchTask::new(
        Arc::new(GrepSearcher::new(GrepConfig::default())),
        Arc::new(LoopbackMounter::new(mount_root)),
    )
}

async fn run_worker(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = WorkerConfig::from_env();
    if let Some(url) = args.broker_url {
        config.broker_url = url;
    }
    if let Some(queue) = args.request_queue {
        config.request_queue = queue;
    }
    if let Some(queue) = args.result_queue {
        config.result_queue = queue;
    }
    if let Some(root) = args.mount_root {
        config.mount_root = root;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }

    let broker = RedisBroker::connect(&config).await?;
    let worker = Worker::new(broker, new_task(config.mount_root.clone()))
        .with_fail_fast(config.fail_fast);

    let token = install_shutdown_handler();
    worker.run(token).await;
    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut targets: Vec<Target> = args.files.into_iter().map(Target::File).collect();
    targets.extend(args.images.into_iter().map(Target::Image));

    let mut request = SearchRequest::new(args.pattern, targets);
    request.case_insensitive = args.ignore_case;
    request.context_lines = args.context;
    request.fail_fast = args.fail_fast;

    let task = new_task(args.mount_root);
    match task.run(&request).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            // grep-style exit codes: 1 when nothing matched
            if report.match_count() == 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Run(run_args) => run_worker(run_args).await,
        Commands::Search(search_args) => run_search(search_args).await,
    }
}
