//! Collection / confirmation resources shown to the user before any action
//! runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::{ActionDefinition, ActionId, FieldSpec, FieldValues};

/// A schema field with its current value, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// What the UI renders for a dispatch.
///
/// `Form` collects the fields still missing. `Confirmation` shows every
/// field pre-filled and waits for an explicit yes before anything executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiResource {
    #[serde(rename_all = "camelCase")]
    Form {
        action_id: ActionId,
        context_id: String,
        title: String,
        component: String,
        fields: Vec<FormField>,
    },
    #[serde(rename_all = "camelCase")]
    Confirmation {
        action_id: ActionId,
        context_id: String,
        title: String,
        component: String,
        summary: String,
        fields: Vec<FormField>,
    },
}

impl UiResource {
    /// Form listing only the missing fields.
    pub fn form(definition: &ActionDefinition, context_id: &str, missing: Vec<FormField>) -> Self {
        Self::Form {
            action_id: definition.id,
            context_id: context_id.to_string(),
            title: definition.description.clone(),
            component: definition.ui_component.clone(),
            fields: missing,
        }
    }

    /// Confirmation with every field pre-filled.
    pub fn confirmation(definition: &ActionDefinition, context_id: &str, fields: Vec<FormField>) -> Self {
        let summary = summarize(&definition.description, &fields);
        Self::Confirmation {
            action_id: definition.id,
            context_id: context_id.to_string(),
            title: definition.description.clone(),
            component: definition.ui_component.clone(),
            summary,
            fields,
        }
    }

    pub fn action_id(&self) -> ActionId {
        match self {
            Self::Form { action_id, .. } | Self::Confirmation { action_id, .. } => *action_id,
        }
    }

    pub fn fields(&self) -> &[FormField] {
        match self {
            Self::Form { fields, .. } | Self::Confirmation { fields, .. } => fields,
        }
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(self, Self::Confirmation { .. })
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Confirmation { summary, .. } => Some(summary),
            Self::Form { .. } => None,
        }
    }

    /// Values currently filled in, keyed by field name.
    pub fn values(&self) -> FieldValues {
        self.fields()
            .iter()
            .filter_map(|f| f.value.clone().map(|v| (f.spec.name.clone(), v)))
            .collect()
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render_text(&self) -> String {
        match self {
            Self::Form { title, fields, .. } => {
                let wanted: Vec<String> = fields
                    .iter()
                    .map(|f| match &f.spec.options {
                        Some(options) if !options.is_empty() => {
                            format!("{} ({})", f.spec.label, options.join(" / "))
                        }
                        _ => f.spec.label.clone(),
                    })
                    .collect();
                format!("[{title}] Still needed: {}", wanted.join(", "))
            }
            Self::Confirmation { summary, .. } => format!("[confirm] {summary}"),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn summarize(description: &str, fields: &[FormField]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|f| {
            f.value
                .as_ref()
                .map(|v| format!("{}: {}", f.spec.label, display_value(v)))
        })
        .collect();
    if parts.is_empty() {
        format!("{description}?")
    } else {
        format!("{description}? {}", parts.join(", "))
    }
}
