#![allow(clippy::result_large_err)]

use crate::core::catalog::OptionCatalog;
use crate::core::composer::{finalize_stage, PipelineDraft, StageDraft};
use crate::core::entities::{FileHandle, Pipeline, StageSkeleton, Template};
use crate::core::error::AppError;
use crate::core::types::InputSelectionKind;
use chrono::Utc;

/// Unbound stage drafts restored from a template, in template order.
#[derive(Debug, Clone)]
pub struct TemplateInstance {
    pub template_id: String,
    pub name: String,
    pub stages: Vec<StageDraft>,
}

/// Extracts stage skeletons from pipelines and turns them back into drafts.
pub struct TemplateManager;

impl TemplateManager {
    /// Strip file bindings from a pipeline's stages. Works in any pipeline status.
    pub fn extract_template(pipeline: &Pipeline, name: &str) -> Result<Template, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("template name must not be blank"));
        }
        Ok(Template {
            id: crate::core::entities::new_id("template"),
            name: name.to_string(),
            stage_skeletons: pipeline.stages.iter().map(|s| s.skeleton()).collect(),
            created_at: Utc::now(),
        })
    }

    /// Rebuild stage drafts from a template. Skeletons are replayed through the
    /// catalog, so a template referencing removed options fails here.
    pub fn instantiate(
        catalog: &OptionCatalog,
        template: &Template,
    ) -> Result<TemplateInstance, AppError> {
        let mut stages = Vec::with_capacity(template.stage_skeletons.len());
        for (index, skeleton) in template.stage_skeletons.iter().enumerate() {
            let draft = replay_skeleton(catalog, skeleton).map_err(|e| {
                AppError::validation(format!(
                    "template '{}' stage {} no longer fits the catalog: {}",
                    template.name,
                    index + 1,
                    e.message
                ))
            })?;
            stages.push(draft);
        }
        Ok(TemplateInstance {
            template_id: template.id.clone(),
            name: template.name.clone(),
            stages,
        })
    }

    /// Bind one file set per stage, yielding a draft ready to compose.
    ///
    /// Each stage's input kind is taken from its bound files: a lone
    /// directory selects `Directory` and anything else `SingleFiles`, when
    /// the objective allows it. Otherwise the objective's default stays and
    /// the shape check rejects the mismatch.
    pub fn bind(
        catalog: &OptionCatalog,
        instance: TemplateInstance,
        files: Vec<Vec<FileHandle>>,
    ) -> Result<PipelineDraft, AppError> {
        if files.len() != instance.stages.len() {
            return Err(AppError::validation(format!(
                "template '{}' has {} stages but {} file sets were given",
                instance.name,
                instance.stages.len(),
                files.len()
            )));
        }
        let mut pipeline = PipelineDraft::new();
        for (mut draft, bound) in instance.stages.into_iter().zip(files) {
            let kind = if bound.len() == 1 && bound[0].is_dir {
                InputSelectionKind::Directory
            } else {
                InputSelectionKind::SingleFiles
            };
            if draft.allowed_input_kinds().contains(&kind) {
                draft.choose_input_kind(kind)?;
            }
            let stage = finalize_stage(catalog, &draft, bound)?;
            pipeline.add_stage(stage);
        }
        Ok(pipeline)
    }

    /// Case-insensitive name filter; a blank query returns everything.
    pub fn search<'t>(templates: &'t [Template], query: &str) -> Vec<&'t Template> {
        let needle = query.trim().to_lowercase();
        templates
            .iter()
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .collect()
    }
}

fn replay_skeleton(
    catalog: &OptionCatalog,
    skeleton: &StageSkeleton,
) -> Result<StageDraft, AppError> {
    let mut draft = StageDraft::default();
    draft.choose_objective(catalog, &skeleton.objective)?;
    draft.choose_platform(catalog, &skeleton.platform)?;
    draft.choose_model(catalog, &skeleton.model)?;
    Ok(draft)
}
