pub mod args;
pub mod commands;

pub use args::{CatalogArgs, JobsArgs, PipelinesArgs, TemplatesArgs, WatchArgs};
use crate::core::config::ConfigLoader;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "migrator")]
#[command(version = crate::VERSION)]
#[command(about = "Submit, track and compose source migration jobs")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: submit a bundle, migrate it, watch until it finishes, then preview and download the result."
)]
pub struct Args {
    /// Workspace holding migrator.toml and local state (default: current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// Mirror logs to the console even for long-running commands
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Submit and manage migration jobs",
        long_about = "Jobs wraps every action on a single migration: upload, migrate, abort, rerun, edit, delete, preview of a transformed file, artifact download and plan generation.",
        after_help = "Examples:\n    migrator jobs submit ./orders.zip --distribution \"Apache Kafka\" --model GPT-4\n    migrator jobs migrate 17"
    )]
    Jobs(JobsArgs),
    #[command(
        about = "Compose and manage multi-stage pipelines",
        long_about = "Pipelines chain stages of objective, platform and model over bound files. Every stage is checked against the option catalog before the pipeline is saved.",
        after_help = "Example:\n    migrator pipelines create --name nightly --stage obj2/plat2/model2=src/A.java,src/B.java"
    )]
    Pipelines(PipelinesArgs),
    #[command(
        about = "Reuse pipeline layouts as templates",
        long_about = "Templates keep the stage layout of a pipeline without its files. Instantiating one binds new files to each stage in order.",
        after_help = "Example:\n    migrator templates instantiate template-1 --name rerun --files ./docs"
    )]
    Templates(TemplatesArgs),
    #[command(
        about = "Inspect the option catalog",
        long_about = "Catalog shows which platforms, models and input kinds each objective allows.",
        after_help = "Example:\n    migrator catalog show"
    )]
    Catalog(CatalogArgs),
    #[command(
        about = "Reconcile local jobs with the transformation service once",
        long_about = "Refresh fetches the remote job list once and overwrites status and file count of every local job the service reports.",
        after_help = "Example:\n    migrator refresh"
    )]
    Refresh,
    #[command(
        about = "Keep job statuses current until interrupted",
        long_about = "Watch polls the transformation service while any job is migrating and prints every change. Polling pauses when nothing is in flight. Stop with Ctrl-C.",
        after_help = "Example:\n    migrator watch --interval 10"
    )]
    Watch(WatchArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = match args.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let logging = crate::logging::init(
        &args.command,
        args.verbose,
        &workspace,
        &config.store.state_dir,
    )?;
    tracing::debug!(
        workspace = %workspace.display(),
        log_file = %logging.log_file_path().display(),
        console = ?logging.console_output(),
        "configuration loaded"
    );

    let app = commands::AppContext::open(config).await?;
    match args.command {
        Command::Jobs(jobs_args) => commands::jobs(&app, jobs_args).await,
        Command::Pipelines(pipelines_args) => commands::pipelines(&app, pipelines_args).await,
        Command::Templates(templates_args) => commands::templates(&app, templates_args).await,
        Command::Catalog(catalog_args) => commands::catalog(&app, catalog_args).await,
        Command::Refresh => commands::refresh(&app).await,
        Command::Watch(watch_args) => commands::watch(&app, watch_args).await,
    }
}
