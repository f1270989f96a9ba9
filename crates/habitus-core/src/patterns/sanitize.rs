//! Free-text sanitizer for pattern descriptions

use crate::error::CaptureError;

/// Punctuation kept in descriptions besides letters, digits and spaces
const ALLOWED_PUNCTUATION: &[char] = &['-', '_', '→', '.', ',', ':', '\'', '"', '/', '(', ')'];

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || ALLOWED_PUNCTUATION.contains(&c)
}

/// Make a description safe to store.
///
/// Line breaks and tabs become spaces, other control characters and
/// disallowed characters are removed, whitespace is collapsed and the
/// result is cut to `max_len` characters. Text with nothing left is
/// rejected.
pub fn sanitize(text: &str, max_len: usize) -> Result<String, CaptureError> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| is_allowed(*c))
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_len).collect();
    let result = truncated.trim();

    if !result.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(CaptureError::SanitizationRejected(format!(
            "no usable content in {:?}",
            text.chars().take(40).collect::<String>()
        )));
    }

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_plain_text() {
        assert_eq!(
            sanitize("use uv instead of pip", 200).unwrap(),
            "use uv instead of pip"
        );
        assert_eq!(
            sanitize("edit → test (src/lib.rs): ok", 200).unwrap(),
            "edit → test (src/lib.rs): ok"
        );
    }

    #[test]
    fn test_strips_control_and_disallowed() {
        assert_eq!(
            sanitize("use\tuv\r\nnot\u{0000} pip; rm -rf $HOME", 200).unwrap(),
            "use uv not pip rm -rf HOME"
        );
        assert_eq!(sanitize("<b>prefer</b> ruff", 200).unwrap(), "bprefer/b ruff");
    }

    #[test]
    fn test_truncates() {
        let long = "a".repeat(500);
        assert_eq!(sanitize(&long, 200).unwrap().len(), 200);
        assert_eq!(sanitize("use uv   ", 4).unwrap(), "use");
    }

    #[test]
    fn test_rejects_empty_result() {
        assert!(matches!(
            sanitize("$$$ ;;; \u{0007}", 200),
            Err(CaptureError::SanitizationRejected(_))
        ));
        assert!(sanitize("   ", 200).is_err());
        assert!(sanitize("... --", 200).is_err());
    }
}
