#![allow(clippy::result_large_err)]

//! Stage drafting and pipeline assembly against the option catalog.
//!
//! Choosing an upstream field always clears everything downstream of it:
//! a new objective clears platform and model, a new platform clears model.

use crate::core::catalog::{Model, OptionCatalog, Platform};
use crate::core::entities::{FileHandle, Pipeline, Stage};
use crate::core::error::AppError;
use crate::core::types::{InputSelectionKind, PipelineStatus};
use chrono::Utc;

/// A stage being configured; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageDraft {
    objective: Option<String>,
    platform: Option<String>,
    model: Option<String>,
    input_selection_kind: Option<InputSelectionKind>,
    allowed_input_kinds: Vec<InputSelectionKind>,
}

/// Start a new stage for `objective_id`.
pub fn begin_stage(catalog: &OptionCatalog, objective_id: &str) -> Result<StageDraft, AppError> {
    let mut draft = StageDraft::default();
    draft.choose_objective(catalog, objective_id)?;
    Ok(draft)
}

impl StageDraft {
    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn input_selection_kind(&self) -> Option<InputSelectionKind> {
        self.input_selection_kind
    }

    pub fn allowed_input_kinds(&self) -> &[InputSelectionKind] {
        &self.allowed_input_kinds
    }

    /// Platforms selectable for the current objective.
    pub fn platform_options<'c>(&self, catalog: &'c OptionCatalog) -> Vec<&'c Platform> {
        match &self.objective {
            Some(objective) => catalog.allowed_platforms(objective),
            None => Vec::new(),
        }
    }

    /// Models selectable for the current objective and platform.
    pub fn model_options<'c>(&self, catalog: &'c OptionCatalog) -> Vec<&'c Model> {
        match (&self.objective, &self.platform) {
            (Some(objective), Some(platform)) => catalog.allowed_models(objective, platform),
            _ => Vec::new(),
        }
    }

    pub fn choose_objective(
        &mut self,
        catalog: &OptionCatalog,
        objective_id: &str,
    ) -> Result<(), AppError> {
        let objective = catalog
            .resolve_objective(objective_id)
            .ok_or_else(|| AppError::validation(format!("unknown objective '{}'", objective_id)))?;
        let kinds = catalog.allowed_input_kinds(&objective.id);

        self.objective = Some(objective.id.clone());
        self.platform = None;
        self.model = None;
        self.input_selection_kind = kinds.first().copied();
        self.allowed_input_kinds = kinds;
        Ok(())
    }

    pub fn choose_platform(
        &mut self,
        catalog: &OptionCatalog,
        platform_id: &str,
    ) -> Result<(), AppError> {
        let Some(objective) = self.objective.as_deref() else {
            return Err(AppError::validation("choose an objective before a platform"));
        };
        if !catalog
            .allowed_platforms(objective)
            .iter()
            .any(|p| p.id == platform_id)
        {
            return Err(AppError::validation(format!(
                "platform '{}' is not allowed for objective '{}'",
                platform_id, objective
            )));
        }
        self.platform = Some(platform_id.to_string());
        self.model = None;
        Ok(())
    }

    pub fn choose_model(&mut self, catalog: &OptionCatalog, model_id: &str) -> Result<(), AppError> {
        if self.platform.is_none() {
            return Err(AppError::validation("choose a platform before a model"));
        }
        if !self.model_options(catalog).iter().any(|m| m.id == model_id) {
            return Err(AppError::validation(format!(
                "model '{}' is not allowed for platform '{}'",
                model_id,
                self.platform.as_deref().unwrap_or_default()
            )));
        }
        self.model = Some(model_id.to_string());
        Ok(())
    }

    pub fn choose_input_kind(&mut self, kind: InputSelectionKind) -> Result<(), AppError> {
        if !self.allowed_input_kinds.contains(&kind) {
            return Err(AppError::validation(format!(
                "input kind '{}' is not allowed here",
                kind
            )));
        }
        self.input_selection_kind = Some(kind);
        Ok(())
    }
}

/// Bind files to a draft, producing a well-formed stage.
pub fn finalize_stage(
    catalog: &OptionCatalog,
    draft: &StageDraft,
    files: Vec<FileHandle>,
) -> Result<Stage, AppError> {
    let objective = draft
        .objective
        .clone()
        .ok_or_else(|| AppError::validation("stage has no objective"))?;
    let platform = draft
        .platform
        .clone()
        .ok_or_else(|| AppError::validation("stage has no platform"))?;
    let model = draft
        .model
        .clone()
        .ok_or_else(|| AppError::validation("stage has no model"))?;
    let kind = draft
        .input_selection_kind
        .ok_or_else(|| AppError::validation("objective allows no input kind"))?;

    check_files(kind, &files)?;
    catalog.check_stage(&objective, &platform, &model, kind)?;

    Ok(Stage {
        id: crate::core::entities::new_id("stage"),
        objective,
        platform,
        model,
        input_selection_kind: kind,
        bound_files: files,
    })
}

/// Shape check: a directory stage takes exactly one directory, a file stage only files.
pub fn check_files(kind: InputSelectionKind, files: &[FileHandle]) -> Result<(), AppError> {
    if files.is_empty() {
        return Err(AppError::validation("no files bound to stage"));
    }
    match kind {
        InputSelectionKind::Directory => {
            if files.len() != 1 || !files[0].is_dir {
                return Err(AppError::validation(
                    "directory input expects exactly one directory",
                ));
            }
        }
        InputSelectionKind::SingleFiles => {
            if let Some(dir) = files.iter().find(|f| f.is_dir) {
                return Err(AppError::validation(format!(
                    "'{}' is a directory but the stage takes single files",
                    dir.name
                )));
            }
        }
    }
    Ok(())
}

/// Assemble finalized stages into a running pipeline.
pub fn compose_pipeline(
    catalog: &OptionCatalog,
    name: &str,
    stages: Vec<Stage>,
) -> Result<Pipeline, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("pipeline name must not be blank"));
    }
    if stages.is_empty() {
        return Err(AppError::validation("pipeline needs at least one stage"));
    }
    for stage in &stages {
        catalog.check_stage(
            &stage.objective,
            &stage.platform,
            &stage.model,
            stage.input_selection_kind,
        )?;
        check_files(stage.input_selection_kind, &stage.bound_files)?;
    }

    Ok(Pipeline {
        id: crate::core::entities::new_id("pipeline"),
        name: name.to_string(),
        total_files: stages.iter().map(Stage::file_count).sum(),
        stages,
        migrated_files: 0,
        status: PipelineStatus::Running,
        errors: String::new(),
        created_at: Utc::now(),
    })
}

/// Ordered collection of finalized stages awaiting a pipeline name.
#[derive(Debug, Clone, Default)]
pub struct PipelineDraft {
    stages: Vec<Stage>,
    next_index: usize,
}

impl PipelineDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage, numbering it `stage-N`. Returns the assigned id.
    pub fn add_stage(&mut self, mut stage: Stage) -> String {
        self.next_index += 1;
        stage.id = format!("stage-{}", self.next_index);
        let id = stage.id.clone();
        self.stages.push(stage);
        id
    }

    pub fn remove_stage(&mut self, id: &str) -> Result<Stage, AppError> {
        let index = self
            .stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::not_found("stage", id))?;
        Ok(self.stages.remove(index))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn compose(self, catalog: &OptionCatalog, name: &str) -> Result<Pipeline, AppError> {
        compose_pipeline(catalog, name, self.stages)
    }
}
