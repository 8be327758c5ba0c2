//! Path helpers shared by the tree resolver and the facade.

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Segment that walks one level up.
pub const PARENT: &str = "..";

/// Segment that stays in place.
pub const CURRENT: &str = ".";

/// A virtual path broken into segments.
#[derive(Debug, PartialEq)]
pub struct Segments<'a> {
    pub absolute: bool,
    pub parts: Vec<&'a str>,
}

/// Splits `path` into segments.
/// A leading `/` marks the path absolute; trailing and repeated separators are dropped.
/// `.` and `..` are kept as-is, the resolver interprets them.
pub fn split(path: &str) -> Segments<'_> {
    let absolute = path.starts_with(SEPARATOR);
    let parts = path
        .split(SEPARATOR)
        .filter(|part| !part.is_empty())
        .collect();
    Segments { absolute, parts }
}

/// Returns true if `name` can name a file or a directory inside a node.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != CURRENT && name != PARENT && !name.contains(SEPARATOR)
}

/// Returns true if `path` denotes the virtual root (`/`, `//`, ...).
pub fn is_virtual_root(path: &str) -> bool {
    path.starts_with(SEPARATOR) && path.trim_matches(SEPARATOR).is_empty()
}

/// Returns the last segment of `path`, ignoring a trailing separator.
pub fn leaf(path: &str) -> Option<&str> {
    split(path).parts.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(
            split("/a/b/c/"),
            Segments {
                absolute: true,
                parts: vec!["a", "b", "c"]
            }
        );
        assert_eq!(
            split("a//b"),
            Segments {
                absolute: false,
                parts: vec!["a", "b"]
            }
        );
        assert_eq!(
            split("../x"),
            Segments {
                absolute: false,
                parts: vec!["..", "x"]
            }
        );
        assert_eq!(split("/").parts.len(), 0);
        assert!(split("/").absolute);
        assert_eq!(split("").parts.len(), 0);
        assert!(!split("").absolute);
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("file.txt"));
        assert!(is_valid_name(".hidden"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
    }

    #[test]
    fn test_is_virtual_root() {
        assert!(is_virtual_root("/"));
        assert!(is_virtual_root("///"));
        assert!(!is_virtual_root(""));
        assert!(!is_virtual_root("/a"));
        assert!(!is_virtual_root("a/"));
    }

    #[test]
    fn test_leaf() {
        assert_eq!(leaf("/docs/readme.txt"), Some("readme.txt"));
        assert_eq!(leaf("docs/"), Some("docs"));
        assert_eq!(leaf("f.txt"), Some("f.txt"));
        assert_eq!(leaf("/"), None);
    }
}
