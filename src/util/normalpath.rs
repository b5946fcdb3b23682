//! Normalized, slash-separated paths.
//!
//! Every path that is stored or compared anywhere in this crate goes
//! through [`normalize`] first. OS-specific paths only exist at the edges
//! (the OS bucket and the CLI); everything in between is a normalized
//! string where `.` is the root and there are no `.`/`..` segments other
//! than a leading run of `..` on relative paths that escape their base.

use thiserror::Error;

/// Errors produced by path normalization and root application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalPathError {
    #[error("path `{path}` must be relative")]
    NotRelative { path: String },

    #[error("path `{path}` is outside the context directory `{base}`")]
    OutsideContext { path: String, base: String },

    #[error(
        "path `{path}` is not contained within any of roots {} - note that specified paths \
         cannot be roots, but must be contained within roots",
        quoted_list(.roots)
    )]
    NotInRoots { path: String, roots: Vec<String> },

    #[error("path `{path}` is contained in multiple roots {}", quoted_list(.roots))]
    MultipleRoots { path: String, roots: Vec<String> },
}

impl NormalPathError {
    /// Whether this error indicates a broken invariant rather than bad input.
    ///
    /// Overlapping roots are rejected when configuration is loaded, so a path
    /// matching more than one root can only come from a logic error upstream.
    pub fn is_internal(&self) -> bool {
        matches!(self, NormalPathError::MultipleRoots { .. })
    }
}

/// Render a list as `"a", "b"` for error messages.
pub fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| format!("\"{}\"", s.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalize a path: forward slashes, no empty or `.` segments, `..`
/// collapsed where possible, no trailing slash. The empty path and `./`
/// both normalize to `.`.
pub fn normalize(path: &str) -> String {
    let path = if std::path::MAIN_SEPARATOR == '\\' {
        path.replace('\\', "/")
    } else {
        path.to_string()
    };
    let rooted = path.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `/..` is `/`
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Normalize a path and require that it is relative and does not escape
/// its root via `..`.
pub fn normalize_and_validate(path: &str) -> Result<String, NormalPathError> {
    let normalized = normalize(path);
    if is_absolute(&normalized) {
        return Err(NormalPathError::NotRelative { path: path.to_string() });
    }
    if escapes(&normalized) {
        return Err(NormalPathError::OutsideContext {
            path: path.to_string(),
            base: ".".to_string(),
        });
    }
    Ok(normalized)
}

/// Whether a normalized path is absolute.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

fn escapes(normalized: &str) -> bool {
    normalized == ".." || normalized.starts_with("../")
}

/// Express `target` relative to `base`.
///
/// Fails with [`NormalPathError::OutsideContext`] when `target` is not
/// `base` itself or below it. Callers often treat that as a signal (the
/// path refers to something outside this tree) rather than a failure.
pub fn relativize(base: &str, target: &str) -> Result<String, NormalPathError> {
    let base = normalize(base);
    let target = normalize(target);
    let outside = || NormalPathError::OutsideContext {
        path: target.clone(),
        base: base.clone(),
    };

    if is_absolute(&base) != is_absolute(&target) || escapes(&target) {
        return Err(outside());
    }
    if base == target {
        return Ok(".".to_string());
    }
    if base == "." {
        return Ok(target);
    }
    if base == "/" {
        return Ok(target[1..].to_string());
    }
    match target.strip_prefix(&base) {
        Some(rest) if rest.starts_with('/') => Ok(rest[1..].to_string()),
        _ => Err(outside()),
    }
}

/// Whether `parent` strictly contains `child`. Both must be normalized.
pub fn contains_path(parent: &str, child: &str) -> bool {
    if parent == child {
        return false;
    }
    match parent {
        "." => !is_absolute(child) && !escapes(child),
        "/" => is_absolute(child),
        _ => child
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('/')),
    }
}

/// Whether `parent` equals or contains `child`. Both must be normalized.
pub fn equals_or_contains_path(parent: &str, child: &str) -> bool {
    parent == child || contains_path(parent, child)
}

/// Whether either path equals or contains the other.
pub fn overlaps(a: &str, b: &str) -> bool {
    equals_or_contains_path(a, b) || equals_or_contains_path(b, a)
}

/// Parent directory. The parent of `.` is `.` and the parent of `/` is `/`.
pub fn dir(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Last path segment.
pub fn base(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(idx) if path.len() > 1 => path[idx + 1..].to_string(),
        _ => path,
    }
}

/// Extension of the last segment including the dot, or empty.
pub fn ext(path: &str) -> String {
    let base = base(path);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_string(),
        _ => String::new(),
    }
}

/// Join segments and normalize the result.
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// Map `path` through a set of source roots.
///
/// Exactly one root must strictly contain `path`; the result is `path`
/// relative to that root. Zero matches is a user error. More than one match
/// means the roots overlap, which configuration loading rejects, so it is
/// reported as an internal error.
pub fn apply_roots<S: AsRef<str>>(roots: &[S], path: &str) -> Result<String, NormalPathError> {
    let path = normalize(path);
    let matching: Vec<&str> = roots
        .iter()
        .map(|r| r.as_ref())
        .filter(|root| contains_path(&normalize(root), &path))
        .collect();

    match matching.as_slice() {
        [] => Err(NormalPathError::NotInRoots {
            path,
            roots: roots.iter().map(|r| r.as_ref().to_string()).collect(),
        }),
        [root] => relativize(root, &path),
        _ => Err(NormalPathError::MultipleRoots {
            path,
            roots: matching.iter().map(|r| r.to_string()).collect(),
        }),
    }
}

/// Find the first pair of overlapping paths in a list, if any.
pub fn first_overlap<S: AsRef<str>>(paths: &[S]) -> Option<(String, String)> {
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            if overlaps(a.as_ref(), b.as_ref()) {
                return Some((a.as_ref().to_string(), b.as_ref().to_string()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), ".");
        assert_eq!(normalize("./"), ".");
        assert_eq!(normalize("a/./b/"), "a/b");
        assert_eq!(normalize("a//b"), "a/b");
        assert_eq!(normalize("a/b/../c"), "a/c");
        assert_eq!(normalize("../a"), "../a");
        assert_eq!(normalize("a/../.."), "..");
        assert_eq!(normalize("/a/../.."), "/");
        assert_eq!(normalize("/a/b/"), "/a/b");
    }

    #[test]
    fn test_normalize_and_validate() {
        assert_eq!(normalize_and_validate("proto/./a.proto").unwrap(), "proto/a.proto");
        assert!(matches!(
            normalize_and_validate("../proto"),
            Err(NormalPathError::OutsideContext { .. })
        ));
        assert!(matches!(
            normalize_and_validate("/abs"),
            Err(NormalPathError::NotRelative { .. })
        ));
    }

    #[test]
    fn test_relativize() {
        assert_eq!(relativize(".", "a/b").unwrap(), "a/b");
        assert_eq!(relativize("a", "a").unwrap(), ".");
        assert_eq!(relativize("a", "a/b/c").unwrap(), "b/c");
        assert_eq!(relativize("/x", "/x/y").unwrap(), "y");
        assert_eq!(relativize("/", "/x/y").unwrap(), "x/y");
        assert!(relativize("a", "ab/c").is_err());
        assert!(relativize("a/b", "a").is_err());
        assert!(relativize(".", "../a").is_err());
        assert!(relativize("/x", "x").is_err());
    }

    #[test]
    fn test_containment() {
        assert!(contains_path(".", "a"));
        assert!(!contains_path(".", "."));
        assert!(contains_path("a", "a/b"));
        assert!(!contains_path("a", "ab"));
        assert!(!contains_path("a", "a"));
        assert!(equals_or_contains_path("a", "a"));
        assert!(overlaps("a/b", "a"));
        assert!(!overlaps("a/b", "a/c"));
    }

    #[test]
    fn test_dir_base_ext() {
        assert_eq!(dir("a/b/c.proto"), "a/b");
        assert_eq!(dir("a"), ".");
        assert_eq!(dir("."), ".");
        assert_eq!(dir("/a"), "/");
        assert_eq!(base("a/b/c.proto"), "c.proto");
        assert_eq!(ext("a/b/c.proto"), ".proto");
        assert_eq!(ext("a/.hidden"), "");
        assert_eq!(join(&["a", "", "./b", "c.proto"]), "a/b/c.proto");
    }

    #[test]
    fn test_apply_roots_picks_unique_root() {
        let roots = ["root1", "root2"];
        assert_eq!(apply_roots(&roots, "root1/pkg/file.proto").unwrap(), "pkg/file.proto");
        assert_eq!(apply_roots(&roots, "root2/x.proto").unwrap(), "x.proto");
    }

    #[test]
    fn test_apply_roots_rejects_unconfigured_root() {
        let roots = ["root1", "root2"];
        let err = apply_roots(&roots, "root3/pkg/file.proto").unwrap_err();
        assert!(matches!(err, NormalPathError::NotInRoots { .. }));
        assert!(!err.is_internal());
        assert!(err.to_string().contains("not contained within any of roots"));
    }

    #[test]
    fn test_apply_roots_rejects_root_itself() {
        assert!(apply_roots(&["root1"], "root1").is_err());
    }

    #[test]
    fn test_apply_roots_overlap_is_internal() {
        let err = apply_roots(&["a", "a/b"], "a/b/c.proto").unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_apply_roots_round_trip() {
        let roots = ["src", "generated", "third_party/proto"];
        for path in [
            "src/a.proto",
            "generated/x/y/z.proto",
            "third_party/proto/google/type/date.proto",
        ] {
            let relative = apply_roots(&roots, path).unwrap();
            let root = roots
                .iter()
                .find(|r| contains_path(r, path))
                .unwrap();
            assert_eq!(join(&[*root, relative.as_str()]), path);
        }
    }

    #[test]
    fn test_first_overlap() {
        assert_eq!(first_overlap(&["a", "b", "c"]), None);
        assert_eq!(
            first_overlap(&["proto", "enterprise/proto", "proto/v1"]),
            Some(("proto".to_string(), "proto/v1".to_string()))
        );
    }
}
