//! Combines model and pattern extraction for one turn.

use crate::onboarding::ProfileDraft;

/// Merge the two extractions. Pattern fields overwrite model fields on
/// collision; a failed model call (`None`) leaves the pattern result as the
/// only source. The unknown-key bucket is bounded afterwards.
pub fn merge(model: Option<ProfileDraft>, pattern: &ProfileDraft) -> ProfileDraft {
    let mut merged = model.unwrap_or_default();
    merged.overlay(pattern);
    merged.bound_extra();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::MAX_EXTRA_FIELDS;
    use rust_decimal_macros::dec;

    #[test]
    fn pattern_wins_on_collision() {
        let model = ProfileDraft {
            city: Some("Lyon".into()),
            income: Some(dec!(850)),
            ..Default::default()
        };
        let pattern = ProfileDraft {
            income: Some(dec!(800)),
            expenses: Some(dec!(600)),
            ..Default::default()
        };
        let merged = merge(Some(model), &pattern);
        assert_eq!(merged.city.as_deref(), Some("Lyon"));
        assert_eq!(merged.income, Some(dec!(800)));
        assert_eq!(merged.expenses, Some(dec!(600)));
    }

    #[test]
    fn model_failure_leaves_pattern_only() {
        let pattern = ProfileDraft {
            academic_events: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(merge(None, &pattern), pattern);
        assert!(merge(None, &ProfileDraft::default()).is_empty());
    }

    #[test]
    fn empty_pattern_keeps_model_result() {
        let model = ProfileDraft {
            name: Some("Alice".into()),
            ..Default::default()
        };
        assert_eq!(merge(Some(model.clone()), &ProfileDraft::default()), model);
    }

    #[test]
    fn extra_bucket_is_bounded() {
        let mut model = ProfileDraft::default();
        for i in 0..40 {
            model.extra.insert(format!("hint{i:02}"), serde_json::json!(true));
        }
        assert_eq!(merge(Some(model), &ProfileDraft::default()).extra.len(), MAX_EXTRA_FIELDS);
    }
}
