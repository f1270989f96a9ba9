//! Tests for the full extraction pass

#[cfg(test)]
mod tests {
    use crate::config::ExtractionConfig;
    use crate::event::ToolExecutionEvent;
    use crate::history::{ToolHistory, ToolInvocation};
    use crate::patterns::{Extraction, ExtractionInput, PatternExtractor};
    use crate::types::{Category, PatternType};
    use chrono::{Duration, Utc};
    use std::collections::HashMap;

    fn extract(
        event: &ToolExecutionEvent,
        recent: &[ToolInvocation],
        usage: &HashMap<String, u32>,
    ) -> Extraction {
        let normalized = event.normalized_text().unwrap();
        PatternExtractor::default().extract(&ExtractionInput {
            event,
            normalized: &normalized,
            recent,
            usage,
        })
    }

    #[test]
    fn test_correction_event() {
        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "pip install requests")
            .with_result("Actually, use uv not pip");

        let extraction = extract(&event, &[], &HashMap::new());
        assert_eq!(extraction.rejected, 0);

        let corrections: Vec<_> = extraction
            .candidates
            .iter()
            .filter(|c| c.pattern_type == PatternType::Correction)
            .collect();
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].category, Category::PackageManagement);
        assert!(corrections[0].confidence.value() >= 0.8);
        assert!(corrections[0].description.contains("uv"));
        assert!(corrections[0].description.contains("pip"));

        // Implicit usage of pip is recorded separately
        assert_eq!(
            extraction.candidates[1].pattern_type,
            PatternType::ToolPreference
        );
        assert_eq!(extraction.candidates[1].description, "use pip for package-management");
    }

    #[test]
    fn test_fixed_extractor_order() {
        let history = ToolHistory::default();
        let now = Utc::now();
        history.record(
            &ToolExecutionEvent::new("Edit")
                .with_arg("file_path", "src/app.py")
                .with_project_path("/work/api")
                .with_timestamp(now - Duration::minutes(1)),
        );

        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "uv add pytest && uv run pytest")
            .with_result("always use uv here")
            .with_project_path("/work/api");

        let recent = history.recent(Some("/work/api"), now - Duration::minutes(5));
        let mut usage = HashMap::new();
        usage.insert("uv".to_string(), 4);

        let extraction = extract(&event, &recent, &usage);
        let types: Vec<_> = extraction
            .candidates
            .iter()
            .map(|c| c.pattern_type)
            .collect();
        assert_eq!(
            types,
            vec![
                PatternType::Correction,
                PatternType::ToolPreference,
                PatternType::Workflow,
                PatternType::Context,
            ]
        );
        assert!(
            extraction
                .candidates
                .iter()
                .all(|c| c.project_path.as_deref() == Some("/work/api"))
        );
    }

    #[test]
    fn test_candidate_invariants_hold() {
        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "npm install left-pad")
            .with_result("prefer pnpm over npm. switch from yarn to pnpm. never use yarn");

        let extraction = extract(&event, &[], &HashMap::new());
        assert!(!extraction.candidates.is_empty());
        for candidate in &extraction.candidates {
            assert!(candidate.is_valid());
            assert!(candidate.description.chars().count() <= 200);
            let confidence = candidate.confidence.value();
            assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn test_sanitizer_rejections_are_counted() {
        let extractor = PatternExtractor::new(ExtractionConfig {
            max_description_len: 0,
            ..ExtractionConfig::default()
        });
        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "pip install requests")
            .with_result("actually use uv not pip");
        let normalized = event.normalized_text().unwrap();
        let usage = HashMap::new();

        let extraction = extractor.extract(&ExtractionInput {
            event: &event,
            normalized: &normalized,
            recent: &[],
            usage: &usage,
        });
        assert!(extraction.candidates.is_empty());
        assert_eq!(extraction.rejected, 2);
    }

    #[test]
    fn test_routine_event_yields_nothing() {
        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "ls -la")
            .with_result("total 0");
        let extraction = extract(&event, &[], &HashMap::new());
        assert!(extraction.candidates.is_empty());
        assert_eq!(extraction.rejected, 0);
    }
}
