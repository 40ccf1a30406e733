use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use skiff_core::SkiffError;

/// Where a skill was discovered. Local skills win over remote ones on name clashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    Local,
    Remote,
}

/// A skill parsed from a SKILL.md file.
///
/// Skills are Markdown documents with YAML frontmatter that contain
/// instructions for the LLM. The runtime does not execute skills; a selected
/// skill's body is placed in the system prompt and the model follows it
/// with its tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Normalized, unique name (lower-case, `-` separated).
    pub name: String,
    /// Display title (frontmatter `title`, else the first `# ` heading, else the name).
    pub title: String,
    /// Short description used for ranking and routing.
    pub description: String,
    /// Tool names the skill expects, in the author's own naming convention.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// The full Markdown body.
    pub body: String,
    /// Absolute path to the SKILL.md file.
    pub file_path: PathBuf,
    pub source: SkillSource,
}

impl Skill {
    /// Parse a SKILL.md file.
    pub fn from_file(path: &Path, source: SkillSource) -> skiff_core::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SkiffError::Skill(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content, path.to_path_buf(), source)
    }

    /// Parse SKILL.md content. The file format is:
    ///
    /// ```text
    /// ---
    /// name: my-skill
    /// title: My Skill
    /// description: What this skill does
    /// allowed-tools: [Read, Bash]
    /// ---
    ///
    /// # My Skill
    ///
    /// Instructions for the LLM...
    /// ```
    pub fn parse(content: &str, file_path: PathBuf, source: SkillSource) -> skiff_core::Result<Self> {
        let (frontmatter, body) = split_frontmatter(content)?;
        let fields = parse_frontmatter(&frontmatter);

        let base_dir = file_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let body = body.replace("{baseDir}", &base_dir.to_string_lossy());

        let name = normalize_name(&fields.name);
        if name.is_empty() {
            return Err(SkiffError::Skill(format!(
                "{}: skill name is empty",
                file_path.display()
            )));
        }
        if fields.description.is_empty() {
            return Err(SkiffError::Skill(format!("skill '{name}' has no description")));
        }

        let title = if fields.title.is_empty() {
            first_heading(&body).unwrap_or_else(|| name.clone())
        } else {
            fields.title
        };

        Ok(Self {
            name,
            title,
            description: fields.description,
            allowed_tools: fields.allowed_tools,
            body,
            file_path,
            source,
        })
    }
}

/// Normalize a skill name: lower-case, non-alphanumeric runs become `-`.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Split a SKILL.md file into YAML frontmatter and Markdown body.
fn split_frontmatter(content: &str) -> skiff_core::Result<(String, String)> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();

    if !trimmed.starts_with("---") {
        return Err(SkiffError::Skill(
            "SKILL.md must start with YAML frontmatter (---)".into(),
        ));
    }

    let after_first = &trimmed[3..];
    let end_pos = after_first
        .find("\n---")
        .ok_or_else(|| SkiffError::Skill("SKILL.md: missing closing --- for frontmatter".into()))?;

    let frontmatter = after_first[..end_pos].trim().to_string();
    let body = after_first[end_pos + 4..].trim().to_string();

    Ok((frontmatter, body))
}

#[derive(Default)]
struct Frontmatter {
    name: String,
    title: String,
    description: String,
    allowed_tools: Vec<String>,
}

/// Parse the simple `key: value` subset of YAML that skill files use.
/// List values may be inline (`[a, b]`, `a, b`) or block (`- a` lines).
fn parse_frontmatter(yaml: &str) -> Frontmatter {
    let mut fm = Frontmatter::default();
    let mut in_tool_list = false;

    for raw_line in yaml.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if in_tool_list {
            if let Some(item) = line.strip_prefix("- ") {
                let item = unquote(item);
                if !item.is_empty() {
                    fm.allowed_tools.push(item);
                }
                continue;
            }
            in_tool_list = false;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "name" => fm.name = unquote(value),
            "title" => fm.title = unquote(value),
            "description" => fm.description = unquote(value),
            "allowed-tools" | "allowed_tools" | "tools" => {
                if value.is_empty() {
                    in_tool_list = true;
                } else {
                    fm.allowed_tools = split_list(value);
                }
            }
            _ => {}
        }
    }

    fm
}

fn split_list(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(unquote)
        .filter(|t| !t.is_empty())
        .collect()
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|l| l.trim().strip_prefix("# "))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// Remove surrounding quotes from a YAML value.
fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> skiff_core::Result<Skill> {
        Skill::parse(
            content,
            PathBuf::from("/skills/test-skill/SKILL.md"),
            SkillSource::Local,
        )
    }

    #[test]
    fn parse_skill_md() {
        let content = r#"---
name: PDF Tools
title: PDF toolbox
description: Extract text and tables from PDF files
allowed-tools: [Read, Bash]
---

# PDF Tools

## Instructions
1. Run `pdftotext` on the file
"#;
        let skill = parse(content).unwrap();
        assert_eq!(skill.name, "pdf-tools");
        assert_eq!(skill.title, "PDF toolbox");
        assert_eq!(skill.description, "Extract text and tables from PDF files");
        assert_eq!(skill.allowed_tools, vec!["Read", "Bash"]);
        assert!(skill.body.starts_with("# PDF Tools"));
        assert_eq!(skill.source, SkillSource::Local);
    }

    #[test]
    fn title_falls_back_to_heading_then_name() {
        let skill = parse("---\nname: a\ndescription: d\n---\n\n# Heading Title\nbody").unwrap();
        assert_eq!(skill.title, "Heading Title");

        let skill = parse("---\nname: plain\ndescription: d\n---\n\nno heading").unwrap();
        assert_eq!(skill.title, "plain");
    }

    #[test]
    fn block_list_allowed_tools() {
        let content = "---\nname: x\ndescription: d\nallowed-tools:\n  - read\n  - \"bash\"\nauthor: me\n---\nbody";
        let skill = parse(content).unwrap();
        assert_eq!(skill.allowed_tools, vec!["read", "bash"]);
    }

    #[test]
    fn comma_list_and_alias_key() {
        let skill = parse("---\nname: x\ndescription: d\ntools: ls, search\n---\nbody").unwrap();
        assert_eq!(skill.allowed_tools, vec!["ls", "search"]);
    }

    #[test]
    fn base_dir_replacement() {
        let skill = parse("---\nname: t\ndescription: d\n---\n\nRead {baseDir}/data.json").unwrap();
        assert!(skill.body.contains("/skills/test-skill/data.json"));
    }

    #[test]
    fn missing_frontmatter_errors() {
        assert!(parse("# No frontmatter\nJust markdown.").is_err());
    }

    #[test]
    fn missing_name_or_description_errors() {
        assert!(parse("---\ndescription: No name\n---\nBody.").is_err());
        assert!(parse("---\nname: no-desc\n---\nBody.").is_err());
        assert!(parse("---\nname: '!!!'\ndescription: d\n---\nBody.").is_err());
    }

    #[test]
    fn quoted_values_parsed() {
        let skill = parse("---\nname: \"quoted-skill\"\ndescription: 'Single quoted'\n---\n\nBody.").unwrap();
        assert_eq!(skill.name, "quoted-skill");
        assert_eq!(skill.description, "Single quoted");
    }

    #[test]
    fn normalize_names() {
        assert_eq!(normalize_name("  Git  Release_Notes! "), "git-release-notes");
        assert_eq!(normalize_name("docx"), "docx");
        assert_eq!(normalize_name("--a--b--"), "a-b");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn from_file_works() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("my-skill");
        std::fs::create_dir_all(&skill_dir).unwrap();
        let skill_path = skill_dir.join("SKILL.md");
        std::fs::write(
            &skill_path,
            "---\nname: my-skill\ndescription: From file test\n---\n\n# My Skill\n\nInstructions here.",
        )
        .unwrap();

        let skill = Skill::from_file(&skill_path, SkillSource::Remote).unwrap();
        assert_eq!(skill.name, "my-skill");
        assert_eq!(skill.title, "My Skill");
        assert_eq!(skill.file_path, skill_path);
        assert_eq!(skill.source, SkillSource::Remote);
    }
}
