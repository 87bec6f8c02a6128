//! Path utilities for safe filesystem operations.

/// Turn a repository name into a single safe directory name.
///
/// Removes path traversal sequences and characters that are not valid in file
/// names on common filesystems, so a hostile catalog entry cannot escape the
/// working directory.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    // replace ".." but allow single "." so names like "spring.io" survive
    if s.is_empty() || s == "." {
        return "_".to_string();
    }

    let s = s.replace("..", "__");
    s.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}
