//! Workspace confinement for path-accepting tools.
//!
//! Paths are joined onto the workspace root and normalized lexically. A path
//! that lands outside the root is rejected before the filesystem is touched.
//! Paths that pass are then checked once more against symlinks: the deepest
//! existing ancestor must canonicalize to somewhere under the root.

use std::path::{Component, Path, PathBuf};

use skiff_core::{Result, SkiffError};

/// Same bound as the kernel's `SYMLOOP_MAX`.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open an existing directory as the workspace. The root is canonicalized.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| {
            SkiffError::Config(format!("workspace root {}: {e}", root.display()))
        })?;
        if !root.is_dir() {
            return Err(SkiffError::Config(format!(
                "workspace root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Use an absolute root as given, without touching the filesystem.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the workspace.
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        let candidate = normalize(&self.root.join(input));
        if !candidate.starts_with(&self.root) {
            return Err(SkiffError::PathEscape {
                path: PathBuf::from(input),
            });
        }
        self.check_symlinks(&candidate, input)?;
        Ok(candidate)
    }

    /// Display form of a resolved path, relative to the root.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => Path::new("."),
            Ok(rel) => rel,
            Err(_) => path,
        }
    }

    fn check_symlinks(&self, candidate: &Path, input: &str) -> Result<()> {
        self.check_link_chain(candidate, input, 0)
    }

    /// Walk up to the deepest entry that exists on disk, counting symlinks
    /// (dangling ones included) as existing. A dangling link is followed
    /// lexically, since `canonicalize` cannot see through it.
    fn check_link_chain(&self, candidate: &Path, input: &str, hops: usize) -> Result<()> {
        let escape = || SkiffError::PathEscape {
            path: PathBuf::from(input),
        };
        if hops > MAX_LINK_HOPS {
            return Err(escape());
        }

        let mut existing = candidate;
        let meta = loop {
            match existing.symlink_metadata() {
                Ok(meta) => break meta,
                Err(_) => match existing.parent() {
                    Some(parent) => existing = parent,
                    None => return Ok(()),
                },
            }
        };
        // Walked above the root: nothing under it exists yet.
        if !existing.starts_with(&self.root) {
            return Ok(());
        }

        if meta.file_type().is_symlink() && !existing.exists() {
            let parent = existing.parent().unwrap_or(self.root.as_path()).canonicalize()?;
            let target = normalize(&parent.join(std::fs::read_link(existing)?));
            if !target.starts_with(&self.root) {
                return Err(escape());
            }
            let next = match candidate.strip_prefix(existing) {
                Ok(rest) if !rest.as_os_str().is_empty() => target.join(rest),
                _ => target,
            };
            return self.check_link_chain(&next, input, hops + 1);
        }

        let real = existing.canonicalize()?;
        if real.starts_with(&self.root) {
            Ok(())
        } else {
            Err(escape())
        }
    }
}

/// Lexically normalize an absolute path: drop `.`, apply `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_stay_inside() {
        let ws = Workspace::at("/work");
        assert_eq!(ws.resolve("notes/a.txt").unwrap(), PathBuf::from("/work/notes/a.txt"));
        assert_eq!(ws.resolve("./x/../y").unwrap(), PathBuf::from("/work/y"));
        assert_eq!(ws.resolve(".").unwrap(), PathBuf::from("/work"));
        assert_eq!(ws.resolve("").unwrap(), PathBuf::from("/work"));
    }

    #[test]
    fn parent_escape_is_rejected() {
        let ws = Workspace::at("/work");
        for input in ["../outside", "a/../../etc/passwd", "..", "/etc/passwd", "/workshop/x"] {
            let err = ws.resolve(input).unwrap_err();
            assert!(matches!(err, SkiffError::PathEscape { .. }), "input: {input}");
        }
    }

    #[test]
    fn absolute_paths_inside_root_are_allowed() {
        let ws = Workspace::at("/work");
        assert_eq!(ws.resolve("/work/a/b").unwrap(), PathBuf::from("/work/a/b"));
    }

    #[test]
    fn relative_display() {
        let ws = Workspace::at("/work");
        assert_eq!(ws.relative(Path::new("/work/a/b")), Path::new("a/b"));
        assert_eq!(ws.relative(Path::new("/work")), Path::new("."));
    }

    #[test]
    fn new_requires_existing_dir() {
        assert!(Workspace::new("/definitely/not/here").is_err());
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        assert_eq!(ws.root(), dir.path().canonicalize().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_workspace_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let ws = Workspace::new(dir.path()).unwrap();
        assert!(matches!(
            ws.resolve("link/secret.txt"),
            Err(SkiffError::PathEscape { .. })
        ));
        assert!(matches!(
            ws.resolve("link/new-file.txt"),
            Err(SkiffError::PathEscape { .. })
        ));
        assert!(ws.resolve("plain.txt").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_out_of_workspace_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("pwned.txt"), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("gone"), dir.path().join("dirlink")).unwrap();

        let ws = Workspace::new(dir.path()).unwrap();
        for input in ["link", "dirlink/new.txt"] {
            assert!(
                matches!(ws.resolve(input), Err(SkiffError::PathEscape { .. })),
                "input: {input}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_inside_workspace_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("later.txt", dir.path().join("alias")).unwrap();
        std::os::unix::fs::symlink("loop-b", dir.path().join("loop-a")).unwrap();
        std::os::unix::fs::symlink("loop-a", dir.path().join("loop-b")).unwrap();

        let ws = Workspace::new(dir.path()).unwrap();
        assert!(ws.resolve("alias").is_ok());
        assert!(matches!(
            ws.resolve("loop-a"),
            Err(SkiffError::PathEscape { .. })
        ));
    }
}
