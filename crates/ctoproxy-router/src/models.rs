use ctoproxy_common::{GlobalConfig, ModelAdapter};
use ctoproxy_protocol::openai::models::{Model, ModelList};

pub const OWNED_BY: &str = "cto-new";

/// Exposed model names and the upstream adapter each one routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    entries: Vec<ModelAdapter>,
    default_adapter: String,
}

impl ModelTable {
    pub fn new(entries: Vec<ModelAdapter>, default_adapter: impl Into<String>) -> Self {
        Self {
            entries,
            default_adapter: default_adapter.into(),
        }
    }

    pub fn from_global(global: &GlobalConfig) -> Self {
        Self::new(global.model_adapters.clone(), global.default_adapter.clone())
    }

    /// Unknown models fall back to the default adapter.
    pub fn adapter_for(&self, model: &str) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.model == model)
            .map(|entry| entry.adapter.as_str())
            .unwrap_or(&self.default_adapter)
    }

    pub fn list(&self, created: i64) -> ModelList {
        ModelList::new(
            self.entries
                .iter()
                .map(|entry| Model::new(entry.model.clone(), created, OWNED_BY))
                .collect(),
        )
    }
}
