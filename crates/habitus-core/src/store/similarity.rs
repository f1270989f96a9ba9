//! Token-set text similarity

use std::collections::BTreeSet;

/// Lowercase alphanumeric tokens of `text`
pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Dice coefficient over token sets, in [0, 1]
pub fn dice_similarity(a: &str, b: &str) -> f32 {
    let a = tokens(a);
    let b = tokens(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let common = a.intersection(&b).count();
    (2 * common) as f32 / (a.len() + b.len()) as f32
}
