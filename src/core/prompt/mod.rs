use crate::core::catalog::OptionCatalog;
use crate::core::entities::{Job, Pipeline};

/// Builds human-readable migration plans from job and pipeline state.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Describe a job's migration plan in a single paragraph.
    pub fn job_prompt(job: &Job) -> String {
        let mut prompt = String::from("Migration Plan: ");
        prompt.push_str(&format!(
            "Migrate the \"{}\" bundle ({} {}) from the {} distribution ",
            job.source_label.trim(),
            job.file_count,
            if job.file_count == 1 { "file" } else { "files" },
            non_blank(&job.source_distribution),
        ));
        prompt.push_str(&format!(
            "using the \"{}\" model. ",
            non_blank(&job.target_model)
        ));
        prompt.push_str(&format!(
            "Submitted {}; current status: {}.",
            job.created_at.format("%Y-%m-%d %H:%M UTC"),
            job.status
        ));
        prompt
    }

    /// Describe each stage of a pipeline, resolving catalog ids to labels.
    pub fn pipeline_prompt(pipeline: &Pipeline, catalog: &OptionCatalog) -> String {
        let mut prompt = format!("# Pipeline: {}\n\n", pipeline.name);
        for (index, stage) in pipeline.stages.iter().enumerate() {
            let objective = catalog
                .objective(&stage.objective)
                .map(|o| o.label.as_str())
                .unwrap_or(&stage.objective);
            let platform = catalog
                .platform(&stage.platform)
                .map(|p| p.label.as_str())
                .unwrap_or(&stage.platform);
            let model = catalog
                .model(&stage.model)
                .map(|m| m.label.as_str())
                .unwrap_or(&stage.model);
            prompt.push_str(&format!(
                "{}. {} on {} with {} over {} {} ({}).\n",
                index + 1,
                objective,
                platform,
                model,
                stage.file_count(),
                if stage.file_count() == 1 { "file" } else { "files" },
                stage.input_selection_kind
            ));
        }
        prompt.push_str(&format!(
            "\nProgress: {}/{} files ({:.0}%), status {}.\n",
            pipeline.migrated_files,
            pipeline.total_files,
            pipeline.progress_percent(),
            pipeline.status
        ));
        if !pipeline.errors.trim().is_empty() {
            prompt.push_str("\n## Errors\n\n");
            prompt.push_str(pipeline.errors.trim());
            prompt.push('\n');
        }
        prompt
    }
}

fn non_blank(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "unspecified"
    } else {
        trimmed
    }
}
