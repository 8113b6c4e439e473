//! Two-tier field extraction: model first, patterns as the deterministic
//! fallback, merged with pattern precedence.

pub mod deadline;
pub mod lists;
pub mod merge;
pub mod model;
pub mod numbers;
pub mod patterns;

use serde::{Deserialize, Serialize};

use crate::onboarding::ProfileDraft;

pub use deadline::normalize_deadline;
pub use merge::merge;
pub use model::ModelExtractor;
pub use patterns::{PatternExtraction, extract_for_step};

/// Which tier produced a turn's extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Model,
    Fallback,
    None,
}

/// Per-turn extraction output. Discarded after the merge into the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub fields: ProfileDraft,
    pub source: ExtractionSource,
    pub missing_info: Vec<String>,
}

impl ExtractionResult {
    /// Combine both tiers.
    ///
    /// Source is `Model` when the model contributed anything, `Fallback` when
    /// only patterns did, `None` when nothing was extracted.
    pub fn combine(model: Option<ProfileDraft>, pattern: PatternExtraction) -> Self {
        let model_contributed = model.as_ref().is_some_and(|m| !m.is_empty());
        let fields = merge(model, &pattern.fields);
        let source = if model_contributed {
            ExtractionSource::Model
        } else if !fields.is_empty() {
            ExtractionSource::Fallback
        } else {
            ExtractionSource::None
        };
        // A hint is void once the model supplied the field.
        let present = fields.to_json();
        let missing_info = pattern
            .missing_info
            .into_iter()
            .filter(|key| present.get(key.as_str()).is_none())
            .collect();
        Self {
            fields,
            source,
            missing_info,
        }
    }

    /// Whether the turn produced complete data for the step.
    ///
    /// A missing-info hint (e.g. goal amount without a purpose) means the
    /// step isn't done even though something was extracted.
    pub fn has_data(&self) -> bool {
        !self.fields.is_empty() && self.missing_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn source_reflects_contributing_tier() {
        let pattern = PatternExtraction {
            fields: ProfileDraft {
                city: Some("Lyon".into()),
                ..Default::default()
            },
            missing_info: vec![],
        };
        assert_eq!(ExtractionResult::combine(None, pattern.clone()).source, ExtractionSource::Fallback);
        assert_eq!(
            ExtractionResult::combine(Some(ProfileDraft::default()), pattern.clone()).source,
            ExtractionSource::Fallback
        );
        let model = ProfileDraft {
            name: Some("Alice".into()),
            ..Default::default()
        };
        assert_eq!(ExtractionResult::combine(Some(model), pattern).source, ExtractionSource::Model);
        assert_eq!(
            ExtractionResult::combine(None, PatternExtraction::default()).source,
            ExtractionSource::None
        );
    }

    #[test]
    fn missing_info_blocks_completion() {
        let pattern = PatternExtraction {
            fields: ProfileDraft {
                goal_amount: Some(dec!(500)),
                ..Default::default()
            },
            missing_info: vec!["goalName".into()],
        };
        let result = ExtractionResult::combine(None, pattern.clone());
        assert!(!result.has_data());
        assert_eq!(result.fields.goal_amount, Some(dec!(500)));

        let model = ProfileDraft {
            goal_name: Some("new laptop".into()),
            ..Default::default()
        };
        let result = ExtractionResult::combine(Some(model), pattern);
        assert!(result.missing_info.is_empty());
        assert!(result.has_data());
    }
}
