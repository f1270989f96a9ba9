//! Semantic categorizer
//!
//! Maps terms onto the fixed [`Category`] taxonomy. Categories are checked
//! in priority order and the first one with a keyword hit wins.

use crate::types::Category;

/// Keyword sets in priority order
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::PackageManagement,
        &[
            "pip", "pip3", "pipx", "uv", "npm", "yarn", "pnpm", "conda", "poetry", "cargo",
            "gem", "bundler", "brew", "apt", "go", "composer", "package", "dependency",
            "dependencies", "install", "management",
        ],
    ),
    (
        Category::Testing,
        &[
            "test", "pytest", "unittest", "jest", "vitest", "mocha", "nextest", "spec",
            "testing", "coverage", "assertion", "mock",
        ],
    ),
    (
        Category::VersionControl,
        &[
            "git", "commit", "branch", "merge", "rebase", "pull", "push", "repository",
            "version", "control", "feature",
        ],
    ),
    (
        Category::CodeQuality,
        &[
            "lint", "format", "style", "prettier", "eslint", "pylint", "ruff", "black", "mypy",
            "clippy", "rustfmt", "quality", "convention", "standard", "check",
        ],
    ),
    (
        Category::BuildTools,
        &[
            "build", "compile", "bundle", "webpack", "vite", "rollup", "make", "cmake", "tsc",
            "setup", "configure", "deploy", "production",
        ],
    ),
    (
        Category::Documentation,
        &[
            "docs", "readme", "documentation", "comment", "docstring", "guide", "manual", "wiki",
            "help",
        ],
    ),
];

/// Keywords shorter than this must match a term exactly
const MIN_SUBSTRING_KEYWORD: usize = 4;

/// Classify a pair of terms (either may be empty)
pub fn classify(term_a: &str, term_b: &str) -> Category {
    classify_terms([term_a, term_b])
}

/// Classify any number of terms
pub fn classify_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Category {
    let words: Vec<String> = terms
        .into_iter()
        .flat_map(|t| t.split(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    if words.is_empty() {
        return Category::General;
    }

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| words.iter().any(|word| keyword_matches(word, kw)))
        })
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

fn keyword_matches(word: &str, keyword: &str) -> bool {
    word == keyword || (keyword.len() >= MIN_SUBSTRING_KEYWORD && word.contains(keyword))
}

/// Keywords for a category (empty for `General`)
pub fn keywords(category: Category) -> &'static [&'static str] {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, kw)| *kw)
        .unwrap_or(&[])
}
