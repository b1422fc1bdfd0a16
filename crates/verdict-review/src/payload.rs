//! Rendering of a pull request into the single text message sent to the agent.

use std::fmt::{self, Write};

use verdict_core::{ChangedFile, PullRequest, RepoId};

/// Placeholder used when the PR has no description.
pub const NO_BODY: &str = "(no PR body)";
/// Placeholder used when the platform returned no patch for a file.
pub const NO_PATCH: &str = "(no patch available)";

const FILE_SEPARATOR: &str = "----------------------------------------";

/// The fully rendered review request.
///
/// Only [`build_payload`] constructs one, so a value of this type is always
/// complete and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPayload(String);

impl ReviewPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ReviewPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render repository, PR metadata and every changed file into one message.
///
/// Deterministic for identical inputs. No size cap is applied.
///
/// # Examples
///
/// ```
/// use verdict_core::{ChangedFile, PullRequest, RepoId};
/// use verdict_review::payload::build_payload;
///
/// let pr = PullRequest { number: 42, title: Some("Tidy".into()), body: None };
/// let files = vec![ChangedFile {
///     filename: "src/main.rs".into(),
///     additions: 2,
///     deletions: 0,
///     patch: None,
/// }];
/// let payload = build_payload(&RepoId::new("octo", "demo"), &pr, &files);
/// assert!(payload.as_str().starts_with("Repository: octo/demo\nPR: #42 - Tidy\n"));
/// assert!(payload.as_str().contains("File: src/main.rs"));
/// ```
pub fn build_payload(repo: &RepoId, pr: &PullRequest, files: &[ChangedFile]) -> ReviewPayload {
    let mut text = String::new();
    let _ = writeln!(text, "Repository: {repo}");
    let _ = writeln!(
        text,
        "PR: #{} - {}",
        pr.number,
        pr.title.as_deref().unwrap_or_default()
    );
    text.push('\n');

    let body = pr.body.as_deref().filter(|b| !b.is_empty()).unwrap_or(NO_BODY);
    let _ = writeln!(text, "Description:\n{body}\n");
    text.push_str("---FILES---\n");

    for file in files {
        let patch = file
            .patch
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(NO_PATCH);
        let _ = writeln!(text, "\nFile: {}", file.filename);
        let _ = writeln!(text, "Additions: {}", file.additions);
        let _ = writeln!(text, "Deletions: {}\n", file.deletions);
        let _ = writeln!(text, "Patch:\n{patch}\n");
        let _ = writeln!(text, "{FILE_SEPARATOR}");
    }

    ReviewPayload(text)
}
