use crate::{
    cli::args::{
        CatalogArgs, CatalogCommand, JobsArgs, JobsCommand, PipelinesArgs, PipelinesCommand,
        TemplatesArgs, TemplatesCommand, WatchArgs,
    },
    core::{
        catalog::OptionCatalog,
        composer::{begin_stage, finalize_stage, PipelineDraft},
        config::MigratorConfig,
        dispatcher::{ActionDispatcher, Confirmation},
        entities::{FileHandle, Job, JobUpdate, NewJob, Pipeline, Stage},
        job_store::{JobQuery, JobStore, StoreEvent},
        persistence::{FileStore, PersistentStore},
        service::{HttpTransformationService, TransformationService},
        synchronizer::StatusSynchronizer,
        template::TemplateManager,
        types::{InputSelectionKind, JobStatus},
    },
    Result,
};
use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use url::Url;

/// Everything a command needs, assembled once per invocation.
pub struct AppContext {
    config: MigratorConfig,
    store: Arc<JobStore>,
    service: Arc<dyn TransformationService>,
    dispatcher: ActionDispatcher,
}

impl AppContext {
    /// Open local state and connect to the configured transformation service.
    pub async fn open(config: MigratorConfig) -> Result<Self> {
        let base_url = Url::parse(&config.service.base_url)
            .with_context(|| format!("invalid service URL '{}'", config.service.base_url))?;
        let service = HttpTransformationService::new(
            base_url,
            Duration::from_secs(config.service.request_timeout_secs),
        )?;
        let persistence = FileStore::new(config.store.state_dir.clone());
        Self::assemble(config, Arc::new(persistence), Arc::new(service)).await
    }

    /// Wire the context around explicit collaborators.
    pub async fn assemble(
        config: MigratorConfig,
        persistence: Arc<dyn PersistentStore>,
        service: Arc<dyn TransformationService>,
    ) -> Result<Self> {
        let catalog = match &config.catalog.file {
            Some(path) => OptionCatalog::load_from_file(path)?,
            None => OptionCatalog::builtin(),
        };
        let store = JobStore::open(persistence, catalog)
            .await
            .with_context(|| {
                format!(
                    "cannot start: local state in {} is unreadable",
                    config.store.state_dir.display()
                )
            })?;
        let store = Arc::new(store);
        let dispatcher = ActionDispatcher::new(store.clone(), service.clone());
        Ok(AppContext {
            config,
            store,
            service,
            dispatcher,
        })
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    fn synchronizer(&self, interval_secs: u64) -> StatusSynchronizer {
        StatusSynchronizer::new(
            self.store.clone(),
            self.service.clone(),
            Duration::from_secs(interval_secs),
        )
    }
}

pub async fn jobs(app: &AppContext, args: JobsArgs) -> Result<()> {
    let dispatcher = app.dispatcher();
    match args.command {
        JobsCommand::List {
            search,
            sort,
            order,
            json,
        } => {
            let query = JobQuery {
                search,
                sort_by: sort,
                order,
            };
            let jobs = app.store().query(&query);
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                print_jobs(&jobs);
            }
        }
        JobsCommand::Submit {
            bundle,
            distribution,
            model,
            label,
        } => {
            let source_label = label
                .or_else(|| NewJob::label_from_bundle(&bundle))
                .ok_or_else(|| anyhow!("cannot derive a label from {}", bundle.display()))?;
            let job = dispatcher
                .submit(NewJob {
                    source_label,
                    source_distribution: distribution,
                    target_model: model,
                    source_bundle: bundle,
                })
                .await?;
            println!("Submitted job {} ({})", job.id, job.source_label);
        }
        JobsCommand::Migrate { id } => {
            let job = dispatcher.migrate(&id).await?;
            println!("Job {} is {}", job.id, job.status);
        }
        JobsCommand::Abort { id } => {
            let job = dispatcher.abort(&id).await?;
            println!("Job {} is {}", job.id, job.status);
        }
        JobsCommand::Rerun { id } => {
            let job = dispatcher.rerun(&id).await?;
            println!("Job {} is {}", job.id, job.status);
        }
        JobsCommand::Delete { id, yes } => {
            dispatcher.delete(&id, Confirmation::from_flag(yes)).await?;
            println!("Deleted job {}", id);
        }
        JobsCommand::Edit {
            id,
            distribution,
            model,
        } => {
            let job = dispatcher
                .edit(
                    &id,
                    JobUpdate {
                        source_distribution: distribution,
                        target_model: model,
                    },
                )
                .await?;
            println!(
                "Job {} now migrates {} with {}",
                job.id, job.source_distribution, job.target_model
            );
        }
        JobsCommand::Preview { id, path } => {
            let diff = dispatcher.preview(&id, &path).await?;
            println!("--- original: {}", diff.path);
            println!("{}", diff.original);
            println!("+++ migrated: {}", diff.path);
            println!("{}", diff.transformed);
        }
        JobsCommand::Download { id, dest } => {
            let written = dispatcher.download(&id, &dest).await?;
            println!("Saved {}", written.display());
        }
        JobsCommand::Prompt { id } => {
            println!("{}", dispatcher.generate_prompt(&id).await?);
        }
    }
    Ok(())
}

pub async fn pipelines(app: &AppContext, args: PipelinesArgs) -> Result<()> {
    let dispatcher = app.dispatcher();
    match args.command {
        PipelinesCommand::List { json } => {
            let pipelines = app.store().list_pipelines();
            if json {
                println!("{}", serde_json::to_string_pretty(&pipelines)?);
            } else {
                print_pipelines(&pipelines);
            }
        }
        PipelinesCommand::Create { name, stages } => {
            let catalog = app.store().catalog();
            let mut draft = PipelineDraft::new();
            for spec in &stages {
                draft.add_stage(parse_stage(&catalog, spec)?);
            }
            let pipeline = dispatcher.save_pipeline(draft, &name).await?;
            println!(
                "Created pipeline {} with {} stages over {} files",
                pipeline.id,
                pipeline.stages.len(),
                pipeline.total_files
            );
        }
        PipelinesCommand::AddFiles { id, paths } => {
            let files = paths
                .iter()
                .map(|p| FileHandle::from_path(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let pipeline = dispatcher.add_files(&id, files).await?;
            println!(
                "Pipeline {} now covers {} files",
                pipeline.id, pipeline.total_files
            );
        }
        PipelinesCommand::Abort { id } => {
            let pipeline = dispatcher.abort_pipeline(&id).await?;
            println!("Pipeline {} is {}", pipeline.id, pipeline.status);
        }
        PipelinesCommand::Rerun { id } => {
            let pipeline = dispatcher.rerun_pipeline(&id).await?;
            println!("Pipeline {} is {}", pipeline.id, pipeline.status);
        }
        PipelinesCommand::Remove { id, yes } => {
            dispatcher
                .remove_pipeline(&id, Confirmation::from_flag(yes))
                .await?;
            println!("Removed pipeline {}", id);
        }
        PipelinesCommand::SaveTemplate { id, name } => {
            let template = dispatcher.save_as_template(&id, &name).await?;
            println!(
                "Saved template {} ({} stages)",
                template.id,
                template.stage_skeletons.len()
            );
        }
        PipelinesCommand::Prompt { id } => {
            println!("{}", dispatcher.generate_pipeline_prompt(&id).await?);
        }
    }
    Ok(())
}

pub async fn templates(app: &AppContext, args: TemplatesArgs) -> Result<()> {
    let dispatcher = app.dispatcher();
    match args.command {
        TemplatesCommand::List { search } => {
            let templates = app.store().list_templates();
            let matching = TemplateManager::search(&templates, search.as_deref().unwrap_or(""));
            if matching.is_empty() {
                println!("No templates");
            }
            for template in matching {
                println!(
                    "{:<40} {:<24} {} stages  {}",
                    template.id,
                    template.name,
                    template.stage_skeletons.len(),
                    template.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        TemplatesCommand::Instantiate { id, name, files } => {
            let instance = dispatcher.instantiate_template(&id).await?;
            let bound = files
                .iter()
                .map(|set| parse_paths(set))
                .collect::<Result<Vec<_>>>()?;
            let draft = TemplateManager::bind(&app.store().catalog(), instance, bound)?;
            let pipeline = dispatcher.save_pipeline(draft, &name).await?;
            println!(
                "Created pipeline {} from template {}",
                pipeline.id, id
            );
        }
        TemplatesCommand::Remove { id, yes } => {
            dispatcher
                .remove_template(&id, Confirmation::from_flag(yes))
                .await?;
            println!("Removed template {}", id);
        }
    }
    Ok(())
}

pub async fn catalog(app: &AppContext, args: CatalogArgs) -> Result<()> {
    let store = app.store();
    match args.command {
        CatalogCommand::Show { json } => {
            let catalog = store.catalog();
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                print_catalog(&catalog);
            }
        }
        CatalogCommand::AddPlatform { label, description } => {
            let id = store
                .update_catalog(|c| c.add_platform(&label, &description))
                .await?;
            println!("Added platform {} ({})", label.trim(), id);
        }
        CatalogCommand::UpdatePlatform {
            id,
            label,
            description,
        } => {
            store.update_catalog(|c| c.update_platform(&id, &label, &description)).await?;
            println!("Updated platform {}", id);
        }
        CatalogCommand::RemovePlatform { id } => {
            store.update_catalog(|c| c.remove_platform(&id)).await?;
            println!("Removed platform {}", id);
        }
        CatalogCommand::AddModel {
            label,
            platform,
            description,
        } => {
            let id = store
                .update_catalog(|c| c.add_model(&label, &platform, &description))
                .await?;
            println!("Added model {} ({})", label.trim(), id);
        }
        CatalogCommand::RemoveModel { id } => {
            store.update_catalog(|c| c.remove_model(&id)).await?;
            println!("Removed model {}", id);
        }
        CatalogCommand::AddObjective {
            label,
            platforms,
            inputs,
        } => {
            let id = store
                .update_catalog(|c| c.add_objective(&label, platforms, inputs))
                .await?;
            println!("Added objective {} ({})", label.trim(), id);
        }
        CatalogCommand::RemoveObjective { id } => {
            store.update_catalog(|c| c.remove_objective(&id)).await?;
            println!("Removed objective {}", id);
        }
        CatalogCommand::SetInputs { id, inputs } => {
            store.update_catalog(|c| c.set_objective_input_kinds(&id, inputs)).await?;
            println!("Updated inputs of objective {}", id);
        }
    }
    Ok(())
}

fn print_catalog(catalog: &OptionCatalog) {
    for objective in &catalog.objectives {
        let kinds = catalog
            .allowed_input_kinds(&objective.id)
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{} ({})  inputs: {}", objective.label, objective.id, kinds);
        for platform in catalog.allowed_platforms(&objective.id) {
            let models = catalog
                .allowed_models(&objective.id, &platform.id)
                .iter()
                .map(|m| format!("{} ({})", m.label, m.id))
                .collect::<Vec<_>>()
                .join(", ");
            println!("    {} ({}): {}", platform.label, platform.id, models);
        }
    }
}

pub async fn refresh(app: &AppContext) -> Result<()> {
    let changed = app
        .synchronizer(app.config.sync.interval_secs)
        .sync_once()
        .await?;
    println!("Refreshed jobs ({} changed)", changed);
    print_jobs(&app.store().query(&JobQuery::default()));
    Ok(())
}

pub async fn watch(app: &AppContext, args: WatchArgs) -> Result<()> {
    let interval_secs = args.interval.unwrap_or(app.config.sync.interval_secs);
    if interval_secs == 0 {
        return Err(anyhow!("--interval must be at least 1 second"));
    }
    if !app.config.sync.skip_overlapping {
        tracing::warn!("overlapping refreshes are not supported; refreshes run one at a time");
    }

    let synchronizer = app.synchronizer(interval_secs);
    let mut events = app.store().subscribe();
    if let Err(e) = synchronizer.sync_once().await {
        tracing::warn!(error = %e, "initial refresh failed");
    }
    let mut last_seen = status_snapshot(&app.store().list());
    print_jobs(&app.store().query(&JobQuery::default()));
    println!("Watching every {}s, Ctrl-C to stop", interval_secs);

    let handle = synchronizer.spawn();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::JobsChanged) | Err(RecvError::Lagged(_)) => {
                    let current = status_snapshot(&app.store().list());
                    for line in describe_changes(&last_seen, &current) {
                        println!("{}", line);
                    }
                    last_seen = current;
                }
                Ok(_) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    handle.shutdown().await;
    Ok(())
}

/// Parse `OBJECTIVE/PLATFORM/MODEL=PATH[,PATH...]` into a finalized stage.
/// A single directory binds as a directory stage, anything else as single files.
fn parse_stage(catalog: &OptionCatalog, spec: &str) -> Result<Stage> {
    let (options, paths) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("stage '{}' must look like OBJECTIVE/PLATFORM/MODEL=PATHS", spec))?;
    let parts: Vec<&str> = options.split('/').map(str::trim).collect();
    let [objective, platform, model] = parts.as_slice() else {
        return Err(anyhow!(
            "stage '{}' must name an objective, a platform and a model",
            spec
        ));
    };

    let files = parse_paths(paths)?;
    let mut draft = begin_stage(catalog, objective)?;
    draft.choose_platform(catalog, platform)?;
    draft.choose_model(catalog, model)?;
    let kind = if files.len() == 1 && files[0].is_dir {
        InputSelectionKind::Directory
    } else {
        InputSelectionKind::SingleFiles
    };
    draft.choose_input_kind(kind)?;
    Ok(finalize_stage(catalog, &draft, files)?)
}

fn parse_paths(list: &str) -> Result<Vec<FileHandle>> {
    let files = list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| FileHandle::from_path(&PathBuf::from(p)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if files.is_empty() {
        return Err(anyhow!("no paths given in '{}'", list));
    }
    Ok(files)
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs");
        return;
    }
    println!(
        "{:<12} {:<24} {:<18} {:<12} {:>6}  {:<10} CREATED",
        "ID", "LABEL", "DISTRIBUTION", "MODEL", "FILES", "STATUS"
    );
    for job in jobs {
        println!(
            "{:<12} {:<24} {:<18} {:<12} {:>6}  {:<10} {}",
            job.id,
            job.source_label,
            job.source_distribution,
            job.target_model,
            job.file_count,
            job.status,
            job.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_pipelines(pipelines: &[Pipeline]) {
    if pipelines.is_empty() {
        println!("No pipelines");
        return;
    }
    for pipeline in pipelines {
        println!(
            "{:<40} {:<20} {:<8} {}/{} ({:.0}%)  {} stages",
            pipeline.id,
            pipeline.name,
            pipeline.status,
            pipeline.migrated_files,
            pipeline.total_files,
            pipeline.progress_percent(),
            pipeline.stages.len()
        );
        if !pipeline.errors.is_empty() {
            println!("    errors: {}", pipeline.errors);
        }
    }
}

fn status_snapshot(jobs: &[Job]) -> HashMap<String, JobStatus> {
    jobs.iter().map(|j| (j.id.clone(), j.status)).collect()
}

fn describe_changes(
    before: &HashMap<String, JobStatus>,
    after: &HashMap<String, JobStatus>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, status) in after {
        match before.get(id) {
            Some(previous) if previous != status => {
                lines.push(format!("job {}: {} -> {}", id, previous, status))
            }
            Some(_) => {}
            None => lines.push(format!("job {}: new ({})", id, status)),
        }
    }
    for id in before.keys().filter(|id| !after.contains_key(*id)) {
        lines.push(format!("job {}: removed", id));
    }
    lines.sort();
    lines
}
