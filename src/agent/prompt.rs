//! Prompts and template builders for the pipeline nodes.
//!
//! The analyst and writer prompts are templates with a single placeholder
//! (`{findings}` and `{insights}`). Templates can be overridden from a
//! directory of markdown files.

use std::path::{Path, PathBuf};

/// System instruction for the researcher.
pub const RESEARCHER_SYSTEM_PROMPT: &str = "You are a data gatherer. Use tools when needed.";

/// Analyst prompt template; `{findings}` receives the joined research data.
pub const ANALYST_PROMPT: &str = "You are a senior analyst.
Extract trends, patterns, and numeric insights from the data below.

{findings}
";

/// Writer prompt template; `{insights}` receives the latest message.
pub const WRITER_PROMPT: &str = r#"You are a newsletter editor.

Compile the analysis into a professional HTML newsletter.

CRITICAL:
- Preserve all markdown links [Title](URL)
- Convert them into clickable HTML links:
  <a href="URL">Title</a>

TRENDS & ANALYSIS:
{insights}
"#;

const FINDINGS_PLACEHOLDER: &str = "{findings}";
const INSIGHTS_PLACEHOLDER: &str = "{insights}";

/// Default prompt directory under the user config dir.
const DEFAULT_PROMPT_SUBDIR: &str = "news-nexus/prompts";

/// Filename for the researcher prompt.
const RESEARCHER_FILENAME: &str = "researcher.md";
/// Filename for the analyst prompt template.
const ANALYST_FILENAME: &str = "analyst.md";
/// Filename for the writer prompt template.
const WRITER_FILENAME: &str = "writer.md";

/// Prompts for all three nodes.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System prompt for the researcher.
    pub researcher: String,
    /// Analyst template.
    pub analyst: String,
    /// Writer template.
    pub writer: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PromptSet {
    /// Loads prompts from `prompt_dir` or the default directory.
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            researcher: load_file(RESEARCHER_FILENAME, RESEARCHER_SYSTEM_PROMPT),
            analyst: load_file(ANALYST_FILENAME, ANALYST_PROMPT),
            writer: load_file(WRITER_FILENAME, WRITER_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            researcher: RESEARCHER_SYSTEM_PROMPT.to_string(),
            analyst: ANALYST_PROMPT.to_string(),
            writer: WRITER_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (RESEARCHER_FILENAME, RESEARCHER_SYSTEM_PROMPT),
            (ANALYST_FILENAME, ANALYST_PROMPT),
            (WRITER_FILENAME, WRITER_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's config dir.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(DEFAULT_PROMPT_SUBDIR))
    }
}

/// Fills the analyst template with the joined research findings.
///
/// A template without the placeholder gets the findings appended.
#[must_use]
pub fn build_analyst_prompt(template: &str, findings: &str) -> String {
    fill(template, FINDINGS_PLACEHOLDER, findings)
}

/// Fills the writer template with the latest insights.
///
/// On a revision pass the previous draft is appended so feedback can be
/// applied to it.
#[must_use]
pub fn build_writer_prompt(template: &str, insights: &str, previous_draft: Option<&str>) -> String {
    let mut prompt = fill(template, INSIGHTS_PLACEHOLDER, insights);
    if let Some(draft) = previous_draft {
        prompt.push_str("\nPREVIOUS DRAFT:\n");
        prompt.push_str(draft);
        prompt.push('\n');
    }
    prompt
}

fn fill(template: &str, placeholder: &str, value: &str) -> String {
    if template.contains(placeholder) {
        template.replace(placeholder, value)
    } else {
        format!("{template}\n\n{value}\n")
    }
}
