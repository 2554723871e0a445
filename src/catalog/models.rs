//! Model catalog.

use serde_json::{json, Value};

/// Catalog id selected when neither the caller nor the configuration names
/// a model.
pub const DEFAULT_MODEL_ID: &str = "default";

/// One selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    /// Value passed to the agent's `--model` flag.
    pub id: &'static str,
    /// Label shown in the model picker.
    pub display_name: &'static str,
    /// One-line description.
    pub description: &'static str,
}

/// Models offered by `model/list`.
pub const MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: DEFAULT_MODEL_ID,
        display_name: "Default",
        description: "Use the agent's configured default model",
    },
    ModelEntry {
        id: "opus",
        display_name: "Claude Opus",
        description: "Most capable model for complex work",
    },
    ModelEntry {
        id: "sonnet",
        display_name: "Claude Sonnet",
        description: "Balanced model for everyday coding",
    },
    ModelEntry {
        id: "haiku",
        display_name: "Claude Haiku",
        description: "Fastest model for quick tasks",
    },
];

/// Catalog in the frontend's `model/list` shape. `default_model` marks the
/// matching entry as default; an unknown or absent value marks
/// [`DEFAULT_MODEL_ID`].
#[must_use]
pub fn model_list(default_model: Option<&str>) -> Vec<Value> {
    let selected = default_model
        .filter(|wanted| MODELS.iter().any(|m| m.id == *wanted))
        .unwrap_or(DEFAULT_MODEL_ID);

    MODELS
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "model": entry.id,
                "displayName": entry.display_name,
                "description": entry.description,
                "supportedReasoningEfforts": [],
                "defaultReasoningEffort": null,
                "isDefault": entry.id == selected,
            })
        })
        .collect()
}
