//! Slash-separated virtual path helpers
//!
//! All virtual paths are absolute. `normalize` is the only place that
//! interprets `.` and `..`; everything else works on normalized strings.

/// Path separator used by every virtual path
pub const SEP: char = '/';

/// Normalize a path: leading `/`, no trailing `/`, no empty, `.` or `..` segments.
///
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.trim().split(SEP) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Non-empty segments of a path, root first
pub fn segments(path: &str) -> Vec<String> {
    normalize(path)
        .split(SEP)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Split a path into its folder and its last segment.
///
/// `/a/b.txt` gives (`/a`, `b.txt`); the root gives (`/`, ``).
pub fn split(path: &str) -> (String, String) {
    let path = normalize(path);
    match path.rfind(SEP) {
        Some(0) => ("/".to_string(), path[1..].to_string()),
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => ("/".to_string(), path),
    }
}

/// Folder part of a path
pub fn parent(path: &str) -> String {
    split(path).0
}

/// Last segment of a path
pub fn basename(path: &str) -> String {
    split(path).1
}

/// Join `rel` onto `base`. An absolute `rel` replaces `base`.
pub fn join(base: &str, rel: &str) -> String {
    if rel.trim().starts_with(SEP) {
        normalize(rel)
    } else {
        normalize(&format!("{base}/{rel}"))
    }
}

/// True when `path` lies strictly below `folder`
pub fn is_below(path: &str, folder: &str) -> bool {
    let path = normalize(path);
    let folder = normalize(folder);
    if folder == "/" {
        return path != "/";
    }
    path.starts_with(&format!("{folder}/"))
}
