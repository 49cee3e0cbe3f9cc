use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors produced while resolving a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path is empty after normalization.
    Empty,
    /// The path tries to climb out of its source with `..`.
    Traversal(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty path"),
            PathError::Traversal(path) => write!(f, "path traversal (..) not allowed: {path}"),
        }
    }
}

impl std::error::Error for PathError {}

/// Maps a logical asset path to a path the backend can open.
pub trait PathResolver {
    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf>;
}

/// Normalizes a logical path.
///
/// - Replaces backslashes with forward slashes
/// - Collapses redundant separators and drops `.` segments
/// - Rejects `..` segments
/// - Strips leading and trailing slashes
pub fn normalize(path: &str) -> Result<String, PathError> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal(path.to_string())),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(segments.join("/"))
}

/// Mount table from source names to native directories.
///
/// A logical path's first segment names its source: with `content` mounted
/// at `/opt/game/data`, `content/textures/brick.png` resolves to
/// `/opt/game/data/textures/brick.png`. Paths whose source is not mounted
/// resolve relative to the working directory, and absolute native paths pass
/// through untouched.
#[derive(Debug, Clone, Default)]
pub struct VirtualPaths {
    mounts: HashMap<String, PathBuf>,
}

impl VirtualPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `dir` as source `name`, replacing any previous mount.
    pub fn mount(&mut self, name: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Self {
        let name = name.into();
        let dir = dir.into();
        log::debug!("mounted `{name}` at {}", dir.display());
        self.mounts.insert(name, dir);
        self
    }
}

impl PathResolver for VirtualPaths {
    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        if Path::new(path).is_absolute() {
            return Ok(PathBuf::from(path));
        }

        let normalized = normalize(path)?;
        let (source, rest) = match normalized.split_once('/') {
            Some((source, rest)) => (source, rest),
            None => (normalized.as_str(), ""),
        };

        Ok(match self.mounts.get(source) {
            Some(dir) if rest.is_empty() => dir.clone(),
            Some(dir) => dir.join(rest),
            None => PathBuf::from(&normalized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(normalize("/textures//./brick.png").unwrap(), "textures/brick.png");
        assert_eq!(normalize("textures\\ui\\icon.png").unwrap(), "textures/ui/icon.png");
    }

    #[test]
    fn rejects_traversal_and_empty() {
        assert!(matches!(normalize("textures/../secret"), Err(PathError::Traversal(_))));
        assert_eq!(normalize("//"), Err(PathError::Empty));
    }

    #[test]
    fn resolves_through_mount() {
        let mut paths = VirtualPaths::new();
        paths.mount("content", "/opt/game/data");
        assert_eq!(
            paths.resolve("content/textures/brick.png").unwrap(),
            Path::new("/opt/game/data/textures/brick.png")
        );
        assert_eq!(paths.resolve("content").unwrap(), Path::new("/opt/game/data"));
    }

    #[test]
    fn unmounted_source_is_relative() {
        let paths = VirtualPaths::new();
        assert_eq!(
            paths.resolve("./assets/a.png").unwrap(),
            Path::new("assets/a.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_pass_through() {
        let paths = VirtualPaths::new();
        assert_eq!(paths.resolve("/tmp/a.png").unwrap(), Path::new("/tmp/a.png"));
    }
}
