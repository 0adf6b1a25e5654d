use crate::core::job_store::{JobSortKey, SortOrder};
use crate::core::types::InputSelectionKind;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List jobs, newest first
    List {
        /// Case-insensitive filter on label, distribution, model or status
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,

        /// Sort column: id, label, distribution, model, created_at, status, file_count
        #[arg(long, default_value = "created_at", value_name = "KEY")]
        sort: JobSortKey,

        /// Sort direction: asc or desc
        #[arg(long, default_value = "desc", value_name = "ORDER")]
        order: SortOrder,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Upload a source bundle as a new job
    Submit {
        /// Zip archive with the source artifacts
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Source distribution, e.g. "Apache Kafka"
        #[arg(long, value_name = "NAME")]
        distribution: String,

        /// Target model, e.g. "GPT-4"
        #[arg(long, value_name = "NAME")]
        model: String,

        /// Job label (default: bundle file name without .zip)
        #[arg(long, value_name = "TEXT")]
        label: Option<String>,
    },
    /// Start migrating an uploaded job
    Migrate {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Cancel a migrating job
    Abort {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Restart an aborted or failed job
    Rerun {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Delete a job locally and remotely
    Delete {
        #[arg(value_name = "JOB_ID")]
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Change the distribution or model of a job
    Edit {
        #[arg(value_name = "JOB_ID")]
        id: String,

        #[arg(long, value_name = "NAME")]
        distribution: Option<String>,

        #[arg(long, value_name = "NAME")]
        model: Option<String>,
    },
    /// Show original and migrated content of one file
    Preview {
        #[arg(value_name = "JOB_ID")]
        id: String,

        /// File path inside the bundle
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Download the migrated artifact
    Download {
        #[arg(value_name = "JOB_ID")]
        id: String,

        /// Destination directory (default: current directory)
        #[arg(long, default_value = ".", value_name = "DIR")]
        dest: PathBuf,
    },
    /// Print a descriptive migration plan for a job
    Prompt {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct PipelinesArgs {
    #[command(subcommand)]
    pub command: PipelinesCommand,
}

#[derive(Subcommand, Debug)]
pub enum PipelinesCommand {
    /// List pipelines with progress
    List {
        #[arg(long)]
        json: bool,
    },
    /// Compose and save a pipeline
    Create {
        /// Pipeline name
        #[arg(long, value_name = "TEXT")]
        name: String,

        /// Stage as OBJECTIVE/PLATFORM/MODEL=PATH[,PATH...]; repeat for more stages
        #[arg(long = "stage", value_name = "SPEC", required = true)]
        stages: Vec<String>,
    },
    /// Add files to a running pipeline
    AddFiles {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,

        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Abort a running pipeline
    Abort {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,
    },
    /// Restart an aborted pipeline
    Rerun {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,
    },
    /// Remove a pipeline
    Remove {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,

        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
    /// Save a pipeline's stage layout as a template
    SaveTemplate {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,

        #[arg(long, value_name = "TEXT")]
        name: String,
    },
    /// Print a descriptive plan for a pipeline
    Prompt {
        #[arg(value_name = "PIPELINE_ID")]
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub command: TemplatesCommand,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List templates
    List {
        /// Case-insensitive name filter
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
    },
    /// Create a pipeline from a template, binding files to each stage in order
    Instantiate {
        #[arg(value_name = "TEMPLATE_ID")]
        id: String,

        /// Name of the new pipeline
        #[arg(long, value_name = "TEXT")]
        name: String,

        /// Files for one stage as PATH[,PATH...]; repeat once per stage
        #[arg(long = "files", value_name = "PATHS", required = true)]
        files: Vec<String>,
    },
    /// Remove a template
    Remove {
        #[arg(value_name = "TEMPLATE_ID")]
        id: String,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Print objectives with their platforms, models and input kinds
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Register a new platform
    AddPlatform {
        #[arg(value_name = "LABEL")]
        label: String,

        #[arg(long, default_value = "", value_name = "TEXT")]
        description: String,
    },
    /// Rename or re-describe a platform
    UpdatePlatform {
        #[arg(value_name = "PLATFORM_ID")]
        id: String,

        #[arg(long, value_name = "LABEL")]
        label: String,

        #[arg(long, default_value = "", value_name = "TEXT")]
        description: String,
    },
    /// Remove a platform, its models and every objective reference to them
    RemovePlatform {
        #[arg(value_name = "PLATFORM_ID")]
        id: String,
    },
    /// Register a model on a platform
    AddModel {
        #[arg(value_name = "LABEL")]
        label: String,

        #[arg(long, value_name = "PLATFORM_ID")]
        platform: String,

        #[arg(long, default_value = "", value_name = "TEXT")]
        description: String,
    },
    /// Remove a model from the catalog
    RemoveModel {
        #[arg(value_name = "MODEL_ID")]
        id: String,
    },
    /// Register an objective over existing platforms
    AddObjective {
        #[arg(value_name = "LABEL")]
        label: String,

        #[arg(long = "platform", value_name = "PLATFORM_ID")]
        platforms: Vec<String>,

        /// Allowed inputs: files, directory (repeatable; none allows both)
        #[arg(long = "input", value_name = "KIND")]
        inputs: Vec<InputSelectionKind>,
    },
    /// Remove an objective
    RemoveObjective {
        #[arg(value_name = "OBJECTIVE_ID")]
        id: String,
    },
    /// Replace the input kinds an objective accepts
    SetInputs {
        #[arg(value_name = "OBJECTIVE_ID")]
        id: String,

        #[arg(long = "input", value_name = "KIND")]
        inputs: Vec<InputSelectionKind>,
    },
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Override the refresh interval in seconds
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,
}
