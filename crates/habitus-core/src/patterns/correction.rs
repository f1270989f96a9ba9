//! Correction and stated-preference detection
//!
//! An ordered table of lexical templates is run over the normalized event
//! text. Templates are tried in table order and each claims the spans it
//! matches, so a later, looser template never re-reads text an earlier one
//! already explained.

use super::Detection;
use crate::category;
use crate::event::ToolExecutionEvent;
use crate::types::{PatternContext, PatternType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

/// Confidence for explicit two-sided corrections
pub const EXPLICIT_CONFIDENCE: f32 = 0.8;
/// Base confidence for one-sided statements
pub const ONE_SIDED_CONFIDENCE: f32 = 0.5;
/// Upper bound for one-sided statements after corroboration
pub const ONE_SIDED_CAP: f32 = 0.7;

/// Surface form a correction was phrased in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionForm {
    /// "actually use X not Y"
    Actually,
    /// "use X not Y", "use X instead of Y"
    UseNot,
    /// "prefer X over Y"
    Prefer,
    /// "switch to X from Y"
    SwitchTo,
    /// "switch from Y to X"
    SwitchFrom,
    /// "don't use Y, use X"
    DontUseUse,
    /// "always use X"
    Always,
    /// "never use Y"
    Never,
    /// "don't use Y"
    DontUse,
    /// "use X for better performance"
    Performance,
    /// "X instead of Y"
    InsteadOf,
}

impl CorrectionForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actually => "actually",
            Self::UseNot => "use_not",
            Self::Prefer => "prefer",
            Self::SwitchTo => "switch_to",
            Self::SwitchFrom => "switch_from",
            Self::DontUseUse => "dont_use_use",
            Self::Always => "always",
            Self::Never => "never",
            Self::DontUse => "dont_use",
            Self::Performance => "performance",
            Self::InsteadOf => "instead_of",
        }
    }
}

/// Terms captured by one template match
#[derive(Debug, Clone, PartialEq, Default)]
struct Terms {
    preferred: Option<String>,
    avoided: Option<String>,
}

const TERM: &str = r"([a-z0-9][a-z0-9._+-]*)";

/// Compile a template; `{term}` marks a captured term
fn template(pattern: &str) -> Regex {
    let expanded = pattern.replace("{term}", TERM);
    Regex::new(&expanded).expect("valid correction template")
}

/// Ordered template table: first match wins per span
static TEMPLATES: Lazy<Vec<(CorrectionForm, Regex)>> = Lazy::new(|| {
    vec![
        (
            CorrectionForm::Actually,
            template(r"\bactually\b[\s,]+(?:(?:you|we)\s+should\s+|please\s+)?use\s+{term}\s+(?:not|instead\s+of|rather\s+than)\s+{term}"),
        ),
        (
            CorrectionForm::UseNot,
            template(r"\buse\s+{term}\s+(?:not|instead\s+of|rather\s+than)\s+{term}"),
        ),
        (
            CorrectionForm::Prefer,
            template(r"\bprefer\s+{term}\s+(?:over|to)\s+{term}"),
        ),
        (
            CorrectionForm::SwitchTo,
            template(r"\b(?:switch|change|move|migrate)\s+to\s+{term}\s+from\s+{term}"),
        ),
        (
            CorrectionForm::SwitchFrom,
            template(r"\b(?:switch|change|move|migrate)\s+from\s+{term}\s+to\s+{term}"),
        ),
        (
            CorrectionForm::DontUseUse,
            template(r"\b(?:don'?t|do\s+not)\s+use\s+{term}[\s,;.]+(?:use|try)\s+{term}"),
        ),
        (CorrectionForm::Always, template(r"\balways\s+use\s+{term}")),
        (CorrectionForm::Never, template(r"\bnever\s+use\s+{term}")),
        (
            CorrectionForm::DontUse,
            template(r"\b(?:don'?t|do\s+not)\s+use\s+{term}"),
        ),
        (
            CorrectionForm::Performance,
            template(r"\buse\s+{term}\s+for\s+(?:better|faster|improved)"),
        ),
        (
            CorrectionForm::InsteadOf,
            template(r"\b{term}\s+(?:instead\s+of|rather\s+than)\s+{term}"),
        ),
    ]
});

static ALWAYS_USE: Lazy<Regex> = Lazy::new(|| template(r"\balways\s+use\s+{term}"));
static NEVER_USE: Lazy<Regex> = Lazy::new(|| template(r"\bnever\s+use\s+{term}"));

/// Words that cannot name a tool
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "anything", "be", "for", "here", "i", "in", "instead", "is", "it",
    "its", "just", "me", "never", "not", "of", "on", "one", "or", "please", "so", "something",
    "that", "the", "them", "then", "there", "these", "this", "those", "to", "use", "using", "we",
    "with", "you", "always",
];

/// Words in the surrounding text that back up a one-sided statement
const CORROBORATION: &[&str] = &["actually", "instead", "prefer", "should", "rather"];

/// Package managers a "use X for faster installs" usually replaces
const REPLACEABLE: &[&str] = &["pip", "npm"];

/// Run the template table over normalized text
pub fn detect(normalized: &str, event: &ToolExecutionEvent) -> Vec<Detection> {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut detections = Vec::new();

    for (form, regex) in TEMPLATES.iter() {
        for caps in regex.captures_iter(normalized) {
            let Some(span) = caps.get(0) else { continue };
            let range = span.range();
            if claimed.iter().any(|c| overlaps(c, &range)) {
                continue;
            }

            let Some(terms) = terms_for(*form, &caps, normalized, event) else {
                continue;
            };
            claimed.push(range);
            detections.push(build(*form, terms, span.as_str(), normalized));
        }
    }

    detections
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn term(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim_end_matches(['.', '-', '_']).to_string())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
}

/// Extract preferred/avoided terms; `None` when a required term is unusable
fn terms_for(
    form: CorrectionForm,
    caps: &Captures<'_>,
    normalized: &str,
    event: &ToolExecutionEvent,
) -> Option<Terms> {
    let terms = match form {
        CorrectionForm::Actually
        | CorrectionForm::UseNot
        | CorrectionForm::Prefer
        | CorrectionForm::SwitchTo
        | CorrectionForm::InsteadOf => Terms {
            preferred: Some(term(caps, 1)?),
            avoided: Some(term(caps, 2)?),
        },
        CorrectionForm::SwitchFrom | CorrectionForm::DontUseUse => Terms {
            preferred: Some(term(caps, 2)?),
            avoided: Some(term(caps, 1)?),
        },
        CorrectionForm::Always => {
            let preferred = term(caps, 1)?;
            let avoided = find_term(&NEVER_USE, normalized).filter(|a| *a != preferred);
            Terms {
                preferred: Some(preferred),
                avoided,
            }
        }
        CorrectionForm::Never | CorrectionForm::DontUse => {
            let avoided = term(caps, 1)?;
            let preferred = find_term(&ALWAYS_USE, normalized).filter(|p| *p != avoided);
            Terms {
                preferred,
                avoided: Some(avoided),
            }
        }
        CorrectionForm::Performance => {
            let preferred = term(caps, 1)?;
            let command = event.command().unwrap_or_default().to_lowercase();
            let avoided = REPLACEABLE
                .iter()
                .find(|tool| {
                    **tool != preferred && command.split_whitespace().any(|w| w == **tool)
                })
                .map(|tool| tool.to_string());
            Terms {
                preferred: Some(preferred),
                avoided,
            }
        }
    };

    if terms.preferred.is_some() && terms.preferred == terms.avoided {
        return None;
    }
    Some(terms)
}

fn find_term(regex: &Regex, text: &str) -> Option<String> {
    regex.captures(text).and_then(|caps| term(&caps, 1))
}

fn build(form: CorrectionForm, terms: Terms, matched: &str, normalized: &str) -> Detection {
    let preferred = terms.preferred.as_deref();
    let avoided = terms.avoided.as_deref();

    let description = describe(form, preferred, avoided);
    let category = category::classify(preferred.unwrap_or_default(), avoided.unwrap_or_default());

    let confidence = match form {
        CorrectionForm::Always
        | CorrectionForm::Never
        | CorrectionForm::DontUse
        | CorrectionForm::Performance => {
            let mut confidence = ONE_SIDED_CONFIDENCE;
            if preferred.is_some() && avoided.is_some() {
                confidence += 0.1;
            }
            if CORROBORATION.iter().any(|w| normalized.contains(w)) {
                confidence += 0.1;
            }
            confidence.min(ONE_SIDED_CAP)
        }
        _ => EXPLICIT_CONFIDENCE,
    };

    let mut context = PatternContext::new()
        .with_extra("form", form.as_str())
        .with_extra("correction_text", matched);
    if let Some(p) = preferred {
        context = context.with_preferred(p);
    }
    if let Some(a) = avoided {
        context = context.with_avoided(a);
    }

    Detection {
        pattern_type: PatternType::Correction,
        category,
        text_content: format!("correction: {} for {}", description, category),
        description,
        confidence,
        context,
    }
}

/// Description template keyed by surface form
fn describe(form: CorrectionForm, preferred: Option<&str>, avoided: Option<&str>) -> String {
    match (form, preferred, avoided) {
        (CorrectionForm::Actually, Some(p), Some(a)) => format!("actually use {} not {}", p, a),
        (CorrectionForm::Prefer, Some(p), Some(a)) => format!("prefer {} over {}", p, a),
        (CorrectionForm::SwitchTo | CorrectionForm::SwitchFrom, Some(p), Some(a)) => {
            format!("switch to {} from {}", p, a)
        }
        (CorrectionForm::Performance, Some(p), _) => format!("use {} for better performance", p),
        (_, Some(p), Some(a)) => format!("use {} instead of {}", p, a),
        (_, Some(p), None) => format!("prefer {}", p),
        (_, None, Some(a)) => format!("avoid {}", a),
        (_, None, None) => "correction pattern detected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn run(text: &str) -> Vec<Detection> {
        detect(text, &ToolExecutionEvent::new("Bash"))
    }

    #[test]
    fn test_actually_use_not() {
        let found = run("bash command pip install requests actually, use uv not pip");
        assert_eq!(found.len(), 1);

        let d = &found[0];
        assert_eq!(d.description, "actually use uv not pip");
        assert_eq!(d.category, Category::PackageManagement);
        assert_eq!(d.confidence, EXPLICIT_CONFIDENCE);
        assert_eq!(d.context.preferred.as_deref(), Some("uv"));
        assert_eq!(d.context.avoided.as_deref(), Some("pip"));
        assert_eq!(
            d.text_content,
            "correction: actually use uv not pip for package-management"
        );
    }

    #[test]
    fn test_two_sided_forms() {
        let cases = [
            ("prefer pytest over unittest", "prefer pytest over unittest"),
            ("switch to ruff from pylint", "switch to ruff from pylint"),
            ("switch from npm to pnpm", "switch to pnpm from npm"),
            ("use rg instead of grep", "use rg instead of grep"),
            ("don't use pip, use uv", "use uv instead of pip"),
            ("pnpm rather than npm please", "use pnpm instead of npm"),
        ];
        for (text, expected) in cases {
            let found = run(text);
            assert_eq!(found.len(), 1, "{}", text);
            assert_eq!(found[0].description, expected);
            assert_eq!(found[0].confidence, EXPLICIT_CONFIDENCE);
        }
    }

    #[test]
    fn test_one_sided_confidence() {
        let plain = run("always use ruff");
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].description, "prefer ruff");
        assert_eq!(plain[0].confidence, ONE_SIDED_CONFIDENCE);
        assert_eq!(plain[0].category, Category::CodeQuality);

        let avoid = run("never use npm");
        assert_eq!(avoid[0].description, "avoid npm");
        assert!(avoid[0].context.preferred.is_none());
    }

    #[test]
    fn test_one_sided_corroborated_elsewhere() {
        let found = run("always use uv. never use pip");
        // Both statements resolve to the same description
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.description == "use uv instead of pip"));
        assert!(found.iter().all(|d| d.confidence > ONE_SIDED_CONFIDENCE));
        assert!(found.iter().all(|d| d.confidence <= ONE_SIDED_CAP));
    }

    #[test]
    fn test_performance_infers_replaced_tool() {
        let event = ToolExecutionEvent::new("Bash").with_arg("command", "pip install numpy");
        let found = detect("use uv for faster installs", &event);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "use uv for better performance");
        assert_eq!(found[0].context.avoided.as_deref(), Some("pip"));
    }

    #[test]
    fn test_first_template_claims_span() {
        // "use uv not pip" and "uv not pip" sit inside the "actually" match
        let found = run("actually use uv not pip");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context.extra.get("form").map(String::as_str), Some("actually"));
    }

    #[test]
    fn test_stopwords_and_noise() {
        assert!(run("use it instead of this").is_empty());
        assert!(run("ls -la total 0").is_empty());
        assert!(run("use pip not pip").is_empty());
    }
}
