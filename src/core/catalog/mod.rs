#![allow(clippy::result_large_err)]

//! Option catalog: the dependency graph objective → platforms → models and
//! objective → allowed input kinds.

use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, InputSelectionKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub label: String,
    pub platform_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub platform_ids: Vec<String>,
    /// Optional narrowing of the models usable for this objective.
    #[serde(default)]
    pub model_ids: Vec<String>,
    #[serde(default)]
    pub input_kinds: Vec<InputSelectionKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OptionCatalog {
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

impl OptionCatalog {
    /// Built-in catalog used when nothing is configured or persisted.
    pub fn builtin() -> Self {
        let platform = |id: &str, label: &str, description: &str| Platform {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
        };
        let model = |id: &str, label: &str, platform_id: &str| Model {
            id: id.to_string(),
            label: label.to_string(),
            platform_id: platform_id.to_string(),
            description: String::new(),
        };
        let objective =
            |id: &str, label: &str, platforms: &[&str], kinds: &[InputSelectionKind]| Objective {
                id: id.to_string(),
                label: label.to_string(),
                platform_ids: platforms.iter().map(|p| p.to_string()).collect(),
                model_ids: Vec::new(),
                input_kinds: kinds.to_vec(),
            };

        OptionCatalog {
            platforms: vec![
                platform("plat1", "Bedrock (AWS)", "Default AWS platform"),
                platform("plat2", "Open AI (Azure)", "Default Azure platform"),
                platform("plat3", "Vertex AI (GCP)", "Default GCP platform"),
            ],
            models: vec![
                model("model1", "Cohere Command R+", "plat1"),
                model("model2", "GPT-4", "plat2"),
                model("model3", "Gemini Pro", "plat3"),
                model("model4", "Codey", "plat3"),
            ],
            objectives: vec![
                objective(
                    "obj1",
                    "Extraction and Analysis",
                    &["plat1", "plat2", "plat3"],
                    &[InputSelectionKind::Directory, InputSelectionKind::SingleFiles],
                ),
                objective(
                    "obj2",
                    "Code Conversion",
                    &["plat2", "plat3"],
                    &[InputSelectionKind::SingleFiles],
                ),
                objective(
                    "obj3",
                    "Documentation",
                    &["plat1", "plat3"],
                    &[],
                ),
            ],
        }
    }

    /// Load a catalog from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to read catalog file {}: {}", path.display(), e),
            )
        })?;
        let catalog: OptionCatalog = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse catalog file {}: {}", path.display(), e),
            )
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check referential integrity of the whole graph.
    pub fn validate(&self) -> Result<(), AppError> {
        for model in &self.models {
            if self.platform(&model.platform_id).is_none() {
                return Err(AppError::validation(format!(
                    "model '{}' references unknown platform '{}'",
                    model.id, model.platform_id
                )));
            }
        }
        for objective in &self.objectives {
            if let Some(missing) = objective
                .platform_ids
                .iter()
                .find(|id| self.platform(id).is_none())
            {
                return Err(AppError::validation(format!(
                    "objective '{}' references unknown platform '{}'",
                    objective.id, missing
                )));
            }
            if let Some(missing) = objective
                .model_ids
                .iter()
                .find(|id| self.model(id).is_none())
            {
                return Err(AppError::validation(format!(
                    "objective '{}' references unknown model '{}'",
                    objective.id, missing
                )));
            }
        }
        Ok(())
    }

    pub fn objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    pub fn platform(&self, id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Look up an objective by id, falling back to a case-insensitive label match.
    pub fn resolve_objective(&self, key: &str) -> Option<&Objective> {
        self.objective(key).or_else(|| {
            self.objectives
                .iter()
                .find(|o| o.label.eq_ignore_ascii_case(key))
        })
    }

    pub fn allowed_platforms(&self, objective_id: &str) -> Vec<&Platform> {
        match self.objective(objective_id) {
            Some(objective) => objective
                .platform_ids
                .iter()
                .filter_map(|id| self.platform(id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn allowed_models(&self, objective_id: &str, platform_id: &str) -> Vec<&Model> {
        let Some(objective) = self.objective(objective_id) else {
            return Vec::new();
        };
        if !objective.platform_ids.iter().any(|p| p == platform_id) {
            return Vec::new();
        }
        self.models
            .iter()
            .filter(|m| m.platform_id == platform_id)
            .filter(|m| objective.model_ids.is_empty() || objective.model_ids.contains(&m.id))
            .collect()
    }

    /// Allowed input kinds for an objective; an empty list allows both.
    pub fn allowed_input_kinds(&self, objective_id: &str) -> Vec<InputSelectionKind> {
        match self.objective(objective_id) {
            Some(objective) if !objective.input_kinds.is_empty() => objective.input_kinds.clone(),
            Some(_) => InputSelectionKind::ALL.to_vec(),
            None => Vec::new(),
        }
    }

    /// Full dependency-graph check for one stage configuration.
    pub fn check_stage(
        &self,
        objective_id: &str,
        platform_id: &str,
        model_id: &str,
        kind: InputSelectionKind,
    ) -> Result<(), AppError> {
        if self.objective(objective_id).is_none() {
            return Err(AppError::validation(format!(
                "unknown objective '{}'",
                objective_id
            )));
        }
        if !self
            .allowed_platforms(objective_id)
            .iter()
            .any(|p| p.id == platform_id)
        {
            return Err(AppError::validation(format!(
                "platform '{}' is not allowed for objective '{}'",
                platform_id, objective_id
            )));
        }
        if !self
            .allowed_models(objective_id, platform_id)
            .iter()
            .any(|m| m.id == model_id)
        {
            return Err(AppError::validation(format!(
                "model '{}' is not allowed for platform '{}'",
                model_id, platform_id
            )));
        }
        if !self.allowed_input_kinds(objective_id).contains(&kind) {
            return Err(AppError::validation(format!(
                "input kind '{}' is not allowed for objective '{}'",
                kind, objective_id
            )));
        }
        Ok(())
    }

    pub fn add_platform(&mut self, label: &str, description: &str) -> Result<String, AppError> {
        let label = require_label(label, "platform")?;
        let id = crate::core::entities::new_id("plat");
        self.platforms.push(Platform {
            id: id.clone(),
            label,
            description: description.trim().to_string(),
        });
        Ok(id)
    }

    pub fn update_platform(
        &mut self,
        id: &str,
        label: &str,
        description: &str,
    ) -> Result<(), AppError> {
        let label = require_label(label, "platform")?;
        let platform = self
            .platforms
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("platform", id))?;
        platform.label = label;
        platform.description = description.trim().to_string();
        Ok(())
    }

    /// Remove a platform together with its models and every objective reference.
    pub fn remove_platform(&mut self, id: &str) -> Result<(), AppError> {
        if self.platform(id).is_none() {
            return Err(AppError::not_found("platform", id));
        }
        let removed_models: Vec<String> = self
            .models
            .iter()
            .filter(|m| m.platform_id == id)
            .map(|m| m.id.clone())
            .collect();
        self.platforms.retain(|p| p.id != id);
        self.models.retain(|m| m.platform_id != id);
        for objective in &mut self.objectives {
            objective.platform_ids.retain(|p| p != id);
            objective.model_ids.retain(|m| !removed_models.contains(m));
        }
        Ok(())
    }

    pub fn add_model(
        &mut self,
        label: &str,
        platform_id: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let label = require_label(label, "model")?;
        if self.platform(platform_id).is_none() {
            return Err(AppError::validation(format!(
                "model must belong to a known platform, got '{}'",
                platform_id
            )));
        }
        let id = crate::core::entities::new_id("model");
        self.models.push(Model {
            id: id.clone(),
            label,
            platform_id: platform_id.to_string(),
            description: description.trim().to_string(),
        });
        Ok(id)
    }

    pub fn remove_model(&mut self, id: &str) -> Result<(), AppError> {
        if self.model(id).is_none() {
            return Err(AppError::not_found("model", id));
        }
        self.models.retain(|m| m.id != id);
        for objective in &mut self.objectives {
            objective.model_ids.retain(|m| m != id);
        }
        Ok(())
    }

    pub fn add_objective(
        &mut self,
        label: &str,
        platform_ids: Vec<String>,
        input_kinds: Vec<InputSelectionKind>,
    ) -> Result<String, AppError> {
        let label = require_label(label, "objective")?;
        if let Some(missing) = platform_ids.iter().find(|id| self.platform(id).is_none()) {
            return Err(AppError::validation(format!(
                "objective references unknown platform '{}'",
                missing
            )));
        }
        let id = crate::core::entities::new_id("obj");
        self.objectives.push(Objective {
            id: id.clone(),
            label,
            platform_ids,
            model_ids: Vec::new(),
            input_kinds,
        });
        Ok(id)
    }

    pub fn remove_objective(&mut self, id: &str) -> Result<(), AppError> {
        if self.objective(id).is_none() {
            return Err(AppError::not_found("objective", id));
        }
        self.objectives.retain(|o| o.id != id);
        Ok(())
    }

    pub fn set_objective_input_kinds(
        &mut self,
        id: &str,
        kinds: Vec<InputSelectionKind>,
    ) -> Result<(), AppError> {
        let objective = self
            .objectives
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| AppError::not_found("objective", id))?;
        let mut deduped = Vec::new();
        for kind in kinds {
            if !deduped.contains(&kind) {
                deduped.push(kind);
            }
        }
        objective.input_kinds = deduped;
        Ok(())
    }
}

fn require_label(label: &str, what: &str) -> Result<String, AppError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} label cannot be blank", what)));
    }
    Ok(trimmed.to_string())
}
