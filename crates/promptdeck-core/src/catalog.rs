//! Prompt catalog loading and browsing.
//!
//! The catalog is a fixed snapshot of markdown documents, one prompt per
//! file. Each file may carry YAML frontmatter (`title`, `category`,
//! `description`, `author`); anything missing is derived from the markdown
//! body the same way the snapshot generator derives it.

use crate::types::Prompt;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors returned when loading the prompt catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid prompt frontmatter in {path}")]
    InvalidFrontmatter { path: String },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parsed frontmatter for a prompt file.
#[derive(Debug, Deserialize)]
struct PromptFrontmatter {
    title: Option<String>,
    category: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

/// Fallback title when neither frontmatter nor a heading supplies one.
const UNTITLED: &str = "Untitled Prompt";
/// Fallback category for prompts without one.
const UNCATEGORIZED: &str = "Uncategorized";

/// In-memory prompt collection, ordered by source filename.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    prompts: Vec<Prompt>,
}

impl PromptCatalog {
    /// Load every `*.md` file in the snapshot directory.
    ///
    /// Idempotent: the same directory contents always produce the same
    /// catalog. Performs no network access.
    pub async fn load(root: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let root = root.as_ref();
        info!("loading prompt catalog (root={})", root.display());
        let mut prompts = Vec::new();
        for path in discover_prompt_files(root) {
            debug!("parsing prompt file: {}", path.display());
            prompts.push(parse_prompt(&path)?);
        }
        info!("prompt catalog loaded (count={})", prompts.len());
        Ok(Self { prompts })
    }

    /// All prompts in filename order.
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Look up a prompt by slug.
    pub fn get(&self, slug: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|prompt| prompt.slug == slug)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for prompt in &self.prompts {
            if !seen.contains(&prompt.category) {
                seen.push(prompt.category.clone());
            }
        }
        seen
    }

    /// Number of prompts in the catalog.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether the catalog holds no prompts.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// Ordering applied to browse results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Upvote count, descending.
    Popular,
    /// Reverse lexicographic slug order, a stand-in for recency.
    Recent,
}

impl SortOrder {
    /// Flip between the two orders.
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Popular => SortOrder::Recent,
            SortOrder::Recent => SortOrder::Popular,
        }
    }

    /// Label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Popular => "popular",
            SortOrder::Recent => "recent",
        }
    }
}

/// Filter and sort the catalog for display.
///
/// The search term matches case-insensitively against title or description;
/// an empty category selects everything. Sorting by popularity treats
/// missing upvote entries as zero.
pub fn browse<'a>(
    prompts: &'a [Prompt],
    search_term: &str,
    category: &str,
    sort: SortOrder,
    upvotes: &HashMap<String, u64>,
) -> Vec<&'a Prompt> {
    let needle = search_term.to_lowercase();
    let mut matches: Vec<&Prompt> = prompts
        .iter()
        .filter(|prompt| {
            let matches_search = prompt.title.to_lowercase().contains(&needle)
                || prompt.description.to_lowercase().contains(&needle);
            let matches_category = category.is_empty() || prompt.category == category;
            matches_search && matches_category
        })
        .collect();
    match sort {
        SortOrder::Popular => {
            matches.sort_by(|a, b| {
                let count_a = upvotes.get(&a.slug).copied().unwrap_or(0);
                let count_b = upvotes.get(&b.slug).copied().unwrap_or(0);
                count_b.cmp(&count_a)
            });
        }
        SortOrder::Recent => {
            matches.sort_by(|a, b| b.slug.cmp(&a.slug));
        }
    }
    matches
}

/// Discover markdown files directly under the snapshot root, sorted by name.
fn discover_prompt_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("prompt snapshot directory missing: {}", root.display());
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "md")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Parse a single prompt file into a `Prompt`.
fn parse_prompt(path: &Path) -> Result<Prompt, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    let (frontmatter, body) = split_frontmatter(&contents, path)?;

    let slug = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();

    let frontmatter_title = frontmatter
        .as_ref()
        .and_then(|meta| meta.title.clone())
        .filter(|value| !value.trim().is_empty());

    // A frontmatter title leaves the body untouched; otherwise the first
    // heading becomes the title and is stripped from the content.
    let (title, content) = match frontmatter_title {
        Some(title) => (title, body.trim().to_string()),
        None => {
            let title = extract_heading(&body).unwrap_or_else(|| UNTITLED.to_string());
            (title, remove_heading(&body))
        }
    };

    let description = frontmatter
        .as_ref()
        .and_then(|meta| meta.description.clone())
        .filter(|value| !value.trim().is_empty())
        .or_else(|| extract_description(&content))
        .unwrap_or_default();

    let category = frontmatter
        .as_ref()
        .and_then(|meta| meta.category.clone())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());

    let author = frontmatter.as_ref().and_then(|meta| meta.author.clone());

    Ok(Prompt {
        slug,
        title,
        category,
        description,
        content,
        author,
    })
}

/// Split YAML frontmatter from the markdown body.
fn split_frontmatter(
    contents: &str,
    path: &Path,
) -> Result<(Option<PromptFrontmatter>, String), CatalogError> {
    let mut lines = contents.lines();
    let Some(first) = lines.next() else {
        return Ok((None, String::new()));
    };

    if first.trim() != "---" {
        return Ok((None, contents.to_string()));
    }

    let mut yaml_lines = Vec::new();
    let mut found_delimiter = false;
    for line in lines.by_ref() {
        if line.trim() == "---" {
            found_delimiter = true;
            break;
        }
        yaml_lines.push(line);
    }

    if !found_delimiter {
        return Err(CatalogError::InvalidFrontmatter {
            path: path.display().to_string(),
        });
    }

    let yaml = yaml_lines.join("\n");
    let metadata: PromptFrontmatter = serde_yaml::from_str(&yaml)?;
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((Some(metadata), body))
}

/// Extract the first level-one heading.
fn extract_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# ").map(|name| name.trim().to_string()))
}

/// Remove the first level-one heading line and trim the result.
fn remove_heading(body: &str) -> String {
    let mut removed = false;
    let kept: Vec<&str> = body
        .lines()
        .filter(|line| {
            if !removed && line.starts_with("# ") {
                removed = true;
                return false;
            }
            true
        })
        .collect();
    kept.join("\n").trim().to_string()
}

/// Extract the first non-empty, non-heading line as a description.
fn extract_description(body: &str) -> Option<String> {
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        return Some(line.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{PromptCatalog, SortOrder, browse};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_prompt(root: &Path, name: &str, contents: &str) {
        std::fs::write(root.join(name), contents).expect("write prompt");
    }

    #[tokio::test]
    async fn frontmatter_overrides_heading() {
        let temp = tempdir().expect("tempdir");
        write_prompt(
            temp.path(),
            "email-draft.md",
            r#"---
title: Email Draft
category: Writing
description: Drafts professional emails.
author: jane
---

# Ignored Heading

Write a follow-up email based on the notes below.
"#,
        );

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        assert_eq!(catalog.len(), 1);
        let prompt = catalog.get("email-draft").expect("prompt");
        assert_eq!(prompt.title, "Email Draft");
        assert_eq!(prompt.category, "Writing");
        assert_eq!(prompt.description, "Drafts professional emails.");
        assert_eq!(prompt.author.as_deref(), Some("jane"));
        // Heading stays in the body when the title came from frontmatter.
        assert!(prompt.content.starts_with("# Ignored Heading"));
    }

    #[tokio::test]
    async fn heading_becomes_title_and_is_removed() {
        let temp = tempdir().expect("tempdir");
        write_prompt(
            temp.path(),
            "code-review.md",
            r#"# Code Review

Review the following diff for correctness.

More detail here.
"#,
        );

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        let prompt = catalog.get("code-review").expect("prompt");
        assert_eq!(prompt.title, "Code Review");
        assert_eq!(prompt.category, "Uncategorized");
        assert_eq!(prompt.description, "Review the following diff for correctness.");
        assert!(prompt.content.starts_with("Review the following diff"));
    }

    #[tokio::test]
    async fn missing_directory_loads_empty() {
        let temp = tempdir().expect("tempdir");
        let catalog = PromptCatalog::load(temp.path().join("nope"))
            .await
            .expect("catalog");
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn categories_keep_first_seen_order() {
        let temp = tempdir().expect("tempdir");
        write_prompt(temp.path(), "a.md", "---\ncategory: Writing\n---\n# A\n\nbody a\n");
        write_prompt(temp.path(), "b.md", "---\ncategory: Coding\n---\n# B\n\nbody b\n");
        write_prompt(temp.path(), "c.md", "---\ncategory: Writing\n---\n# C\n\nbody c\n");

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        assert_eq!(catalog.categories(), vec!["Writing", "Coding"]);
    }

    #[tokio::test]
    async fn title_search_always_finds_its_prompt() {
        let temp = tempdir().expect("tempdir");
        write_prompt(temp.path(), "alpha.md", "# Alpha Helper\n\nFirst body.\n");
        write_prompt(temp.path(), "beta.md", "# Beta Helper\n\nSecond body.\n");

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        let upvotes = HashMap::new();
        for prompt in catalog.prompts() {
            let results = browse(
                catalog.prompts(),
                &prompt.title,
                "",
                SortOrder::Popular,
                &upvotes,
            );
            assert!(results.iter().any(|found| found.slug == prompt.slug));
        }
    }

    #[tokio::test]
    async fn popular_sort_is_non_increasing() {
        let temp = tempdir().expect("tempdir");
        write_prompt(temp.path(), "a.md", "# A\n\nbody\n");
        write_prompt(temp.path(), "b.md", "# B\n\nbody\n");
        write_prompt(temp.path(), "c.md", "# C\n\nbody\n");

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        let upvotes = HashMap::from([
            ("a".to_string(), 2),
            ("b".to_string(), 7),
        ]);
        let results = browse(catalog.prompts(), "", "", SortOrder::Popular, &upvotes);
        let counts: Vec<u64> = results
            .iter()
            .map(|prompt| upvotes.get(&prompt.slug).copied().unwrap_or(0))
            .collect();
        assert_eq!(counts, vec![7, 2, 0]);
    }

    #[tokio::test]
    async fn recent_sort_is_reverse_slug_order() {
        let temp = tempdir().expect("tempdir");
        write_prompt(temp.path(), "alpha.md", "# A\n\nbody\n");
        write_prompt(temp.path(), "zeta.md", "# Z\n\nbody\n");
        write_prompt(temp.path(), "mid.md", "# M\n\nbody\n");

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        let results = browse(
            catalog.prompts(),
            "",
            "",
            SortOrder::Recent,
            &HashMap::new(),
        );
        let slugs: Vec<&str> = results.iter().map(|prompt| prompt.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zeta", "mid", "alpha"]);
    }

    #[tokio::test]
    async fn category_filter_is_exact() {
        let temp = tempdir().expect("tempdir");
        write_prompt(temp.path(), "a.md", "---\ncategory: Writing\n---\n# A\n\nbody\n");
        write_prompt(temp.path(), "b.md", "---\ncategory: Coding\n---\n# B\n\nbody\n");

        let catalog = PromptCatalog::load(temp.path()).await.expect("catalog");
        let results = browse(
            catalog.prompts(),
            "",
            "Coding",
            SortOrder::Popular,
            &HashMap::new(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slug, "b");
    }
}
