use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::definition::{Skill, SkillSource};

/// Discovers SKILL.md files in a list of directories.
///
/// Directories are listed in precedence order: when two directories hold a
/// skill with the same name, the first one wins.
pub struct SkillRegistry {
    skills_dirs: Vec<PathBuf>,
    source: SkillSource,
}

impl SkillRegistry {
    pub fn new(dirs: &[PathBuf], source: SkillSource) -> Self {
        Self {
            skills_dirs: dirs.to_vec(),
            source,
        }
    }

    /// Load every parseable skill. Unreadable or malformed files are skipped
    /// with a warning; a missing directory is not an error.
    pub fn discover(&self) -> skiff_core::Result<Vec<Skill>> {
        let mut seen = HashSet::new();
        let mut loaded = Vec::new();

        for dir in &self.skills_dirs {
            if !dir.is_dir() {
                debug!(?dir, "skills directory does not exist, skipping");
                continue;
            }

            let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            paths.sort();

            for path in paths {
                let skill_md = if path.is_dir() {
                    path.join("SKILL.md")
                } else if path.file_name().is_some_and(|n| n == "SKILL.md") {
                    path
                } else {
                    continue;
                };
                if !skill_md.is_file() {
                    continue;
                }

                match Skill::from_file(&skill_md, self.source) {
                    Ok(skill) => {
                        if seen.insert(skill.name.clone()) {
                            info!(skill = %skill.name, path = ?skill_md, "loaded skill");
                            loaded.push(skill);
                        } else {
                            debug!(
                                skill = %skill.name,
                                path = ?skill_md,
                                "skill already loaded from higher-priority directory, skipping"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(path = ?skill_md, error = %e, "failed to load skill");
                    }
                }
            }
        }

        Ok(loaded)
    }
}

/// The merged, name-sorted, read-only set of skills a run selects from.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    skills: Vec<Arc<Skill>>,
}

impl Catalog {
    /// Build a catalog from skills in precedence order. Duplicate names keep
    /// the first occurrence.
    pub fn new(skills: impl IntoIterator<Item = Skill>) -> Self {
        let mut seen = HashSet::new();
        let mut skills: Vec<Arc<Skill>> = skills
            .into_iter()
            .filter(|s| {
                let fresh = seen.insert(s.name.clone());
                if !fresh {
                    debug!(skill = %s.name, source = ?s.source, "shadowed by higher-precedence skill");
                }
                fresh
            })
            .map(Arc::new)
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Self { skills }
    }

    /// Merge local and remote skills. Local skills win on name clashes.
    pub fn merge(local: Vec<Skill>, remote: Vec<Skill>) -> Self {
        Self::new(local.into_iter().chain(remote))
    }

    /// Discover local directories and remote checkouts, then merge.
    pub fn load(local_dirs: &[PathBuf], remote_dirs: &[PathBuf]) -> skiff_core::Result<Self> {
        let local = SkillRegistry::new(local_dirs, SkillSource::Local).discover()?;
        let remote = SkillRegistry::new(remote_dirs, SkillSource::Remote).discover()?;
        let catalog = Self::merge(local, remote);
        info!(skills = catalog.len(), "skill catalog ready");
        Ok(catalog)
    }

    pub fn skills(&self) -> &[Arc<Skill>] {
        &self.skills
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Skill>> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Directories to scan inside a remote checkout: a top-level `skills/`
/// folder first, then the checkout root itself.
pub fn remote_skill_dirs(checkout: &Path) -> Vec<PathBuf> {
    vec![checkout.join("skills"), checkout.to_path_buf()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(root: &Path, dir: &str, name: &str, description: &str) {
        let skill_dir = root.join(dir);
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n# {name}\n\nDo things."),
        )
        .unwrap();
    }

    fn skill(name: &str, description: &str, source: SkillSource) -> Skill {
        Skill {
            name: name.into(),
            title: name.into(),
            description: description.into(),
            allowed_tools: vec![],
            body: "Body.".into(),
            file_path: PathBuf::from(format!("/skills/{name}/SKILL.md")),
            source,
        }
    }

    #[test]
    fn discover_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "my-skill", "my-skill", "First skill");
        write_skill(dir.path(), "another", "another", "Second skill");

        // Non-skill directory (no SKILL.md) should be ignored
        let noise_dir = dir.path().join("not-a-skill");
        std::fs::create_dir_all(&noise_dir).unwrap();
        std::fs::write(noise_dir.join("README.md"), "Just a readme.").unwrap();

        let loaded = SkillRegistry::new(&[dir.path().to_path_buf()], SkillSource::Local)
            .discover()
            .unwrap();
        let names: Vec<_> = loaded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["another", "my-skill"]);
    }

    #[test]
    fn discover_skill_md_at_dir_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("SKILL.md"),
            "---\nname: root-skill\ndescription: Lives at the root\n---\nBody.",
        )
        .unwrap();
        let loaded = SkillRegistry::new(&[dir.path().to_path_buf()], SkillSource::Remote)
            .discover()
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].source, SkillSource::Remote);
    }

    #[test]
    fn malformed_skill_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "good", "good", "Fine");
        let bad = dir.path().join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("SKILL.md"), "no frontmatter here").unwrap();

        let loaded = SkillRegistry::new(&[dir.path().to_path_buf()], SkillSource::Local)
            .discover()
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "good");
    }

    #[test]
    fn precedence_higher_dir_wins() {
        let high = tempfile::tempdir().unwrap();
        let low = tempfile::tempdir().unwrap();
        write_skill(high.path(), "dup", "dup", "High priority version");
        write_skill(low.path(), "dup", "dup", "Low priority version");

        let loaded = SkillRegistry::new(
            &[high.path().to_path_buf(), low.path().to_path_buf()],
            SkillSource::Local,
        )
        .discover()
        .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].description, "High priority version");
    }

    #[test]
    fn nonexistent_dir_is_fine() {
        let loaded = SkillRegistry::new(
            &[PathBuf::from("/nonexistent/path/to/skills")],
            SkillSource::Local,
        )
        .discover()
        .unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn merge_prefers_local_and_sorts() {
        let catalog = Catalog::merge(
            vec![skill("zeta", "local zeta", SkillSource::Local), skill("docx", "local docx", SkillSource::Local)],
            vec![skill("docx", "remote docx", SkillSource::Remote), skill("alpha", "remote alpha", SkillSource::Remote)],
        );
        let names: Vec<_> = catalog.skills().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "docx", "zeta"]);
        let docx = catalog.get("docx").unwrap();
        assert_eq!(docx.description, "local docx");
        assert_eq!(docx.source, SkillSource::Local);
    }

    #[test]
    fn load_combines_local_and_remote_dirs() {
        let local = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        write_skill(local.path(), "pdf", "pdf", "Local pdf");
        write_skill(&checkout.path().join("skills"), "pdf", "pdf", "Remote pdf");
        write_skill(&checkout.path().join("skills"), "xlsx", "xlsx", "Remote spreadsheets");

        let catalog =
            Catalog::load(&[local.path().to_path_buf()], &remote_skill_dirs(checkout.path())).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("pdf").unwrap().source, SkillSource::Local);
        assert_eq!(catalog.get("xlsx").unwrap().source, SkillSource::Remote);
    }

    #[test]
    fn empty_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.get("anything").is_none());
    }
}
