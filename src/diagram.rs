//! Mermaid diagram rendering
//!
//! Wraps Mermaid source in an interactive HTML page (pan/zoom, SVG and
//! PNG export) by substituting placeholder tokens in a template.

use crate::error::{Error, Result, TemplateError};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Template shipped with the binary
pub const BUILTIN_TEMPLATE: &str = include_str!("../assets/interactive-diagram-template.html");

pub const DEFAULT_TITLE: &str = "Flow Diagram";
pub const DEFAULT_BACKGROUND: &str = "#f5f5f5";

const TITLE_TOKEN: &str = "{{DIAGRAM_TITLE}}";
const THEME_TOKEN: &str = "{{THEME}}";
const BACKGROUND_TOKEN: &str = "{{BACKGROUND_COLOR}}";
const CODE_TOKEN: &str = "{{MERMAID_CODE}}";

/// Mermaid built-in themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
    Base,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Default,
        Theme::Forest,
        Theme::Dark,
        Theme::Neutral,
        Theme::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Forest => "forest",
            Theme::Dark => "dark",
            Theme::Neutral => "neutral",
            Theme::Base => "base",
        }
    }

    /// Parse a theme name, falling back to `default` with a warning
    pub fn parse_lenient(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str() == name)
            .unwrap_or_else(|| {
                warn!("Unknown theme '{}'. Using 'default'.", name);
                Theme::Default
            })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DiagramOptions {
    pub title: String,
    pub theme: Theme,
    pub background: String,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            theme: Theme::Default,
            background: DEFAULT_BACKGROUND.to_string(),
        }
    }
}

/// Load a template file, or the built-in one when no path is given
pub fn read_template(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(BUILTIN_TEMPLATE.to_string()),
        Some(path) if !path.exists() => Err(Error::Template(TemplateError::NotFound(
            path.display().to_string(),
        ))),
        Some(path) => fs::read_to_string(path).map_err(|e| Error::read(path, e)),
    }
}

/// Read Mermaid source, unwrapping a surrounding code fence if present
pub fn read_mermaid(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Template(TemplateError::SourceNotFound(
            path.display().to_string(),
        )));
    }
    let content = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    Ok(strip_code_fence(&content))
}

/// Drop the opening and closing fence lines of a fenced block
pub fn strip_code_fence(content: &str) -> String {
    let content = content.trim();
    if !content.starts_with("```") {
        return content.to_string();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() > 2 {
        lines[1..lines.len() - 1].join("\n")
    } else {
        content.to_string()
    }
}

/// Substitute every placeholder occurrence in `template`
pub fn render(template: &str, mermaid_code: &str, options: &DiagramOptions) -> String {
    template
        .replace(TITLE_TOKEN, &options.title)
        .replace(THEME_TOKEN, options.theme.as_str())
        .replace(BACKGROUND_TOKEN, &options.background)
        .replace(CODE_TOKEN, mermaid_code)
}

/// Placeholder tokens still present after rendering, in order of first appearance
pub fn unresolved_placeholders(html: &str) -> Vec<String> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").expect("valid regex"));

    let mut seen = Vec::new();
    for cap in re.captures_iter(html) {
        let name = cap[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Write HTML output, creating parent directories as needed
pub fn write_html(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::create_dir(parent, e))?;
    }
    fs::write(path, html).map_err(|e| Error::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_template_has_every_token() {
        for token in [TITLE_TOKEN, THEME_TOKEN, BACKGROUND_TOKEN, CODE_TOKEN] {
            assert!(BUILTIN_TEMPLATE.contains(token), "missing {}", token);
        }
    }

    #[test]
    fn test_render_replaces_all_tokens() {
        let options = DiagramOptions {
            title: "User Journey".to_string(),
            theme: Theme::Dark,
            background: "#1a1a1a".to_string(),
        };
        let html = render(BUILTIN_TEMPLATE, "graph TD\n  A-->B", &options);

        assert!(unresolved_placeholders(&html).is_empty());
        assert!(html.contains("<title>User Journey</title>"));
        assert!(html.contains("theme: 'dark'"));
        assert!(html.contains("background: #1a1a1a"));
        assert!(html.contains("A-->B"));
    }

    #[test]
    fn test_render_replaces_repeated_tokens() {
        let html = render("{{THEME}} {{THEME}}", "", &DiagramOptions::default());
        assert_eq!(html, "default default");
    }

    #[test]
    fn test_unresolved_placeholders_reports_unknown_tokens() {
        let html = render(
            "{{DIAGRAM_TITLE}} {{FOOTER}} {{FOOTER}} {{LOGO_URL}}",
            "",
            &DiagramOptions::default(),
        );
        assert_eq!(unresolved_placeholders(&html), vec!["FOOTER", "LOGO_URL"]);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```mermaid\ngraph LR\nA-->B\n```\n"), "graph LR\nA-->B");
        assert_eq!(strip_code_fence("  graph LR\nA-->B  "), "graph LR\nA-->B");
        assert_eq!(strip_code_fence("```\n```"), "```\n```");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Theme::parse_lenient("forest"), Theme::Forest);
        assert_eq!(Theme::parse_lenient("neon"), Theme::Default);
    }

    #[test]
    fn test_read_mermaid_missing() {
        let err = read_mermaid(Path::new("/nonexistent/flow.mmd")).unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::SourceNotFound(_))));
    }

    #[test]
    fn test_read_template_missing() {
        let err = read_template(Some(Path::new("/nonexistent/t.html"))).unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_write_html_creates_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out").join("diagram.html");
        write_html(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
