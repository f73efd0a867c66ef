//! Path templates (`/projects/{project_id}/widgets/{id}`).

use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+([a-z]+\d*)?$").expect("valid regex"));

/// `Some(name)` when the whole segment is a single placeholder.
pub fn segment_placeholder(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['{', '}']) {
        return None;
    }
    Some(inner)
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn is_version_segment(segment: &str) -> bool {
    VERSION_RE.is_match(segment)
}

/// Leading version segment of a path (`/v1/widgets` → `v1`).
pub fn path_version(path: &str) -> Option<&str> {
    segments(path).next().filter(|s| is_version_segment(s))
}

/// Replaces the leading version segment; `None` when the path has none.
pub fn with_version(path: &str, version: &str) -> Option<String> {
    let current = path_version(path)?;
    let prefix = format!("/{current}");
    let rest = path.strip_prefix(&prefix)?;
    Some(format!("/{version}{rest}"))
}

/// Substitutes every placeholder using `lookup`; the first unresolved name is
/// returned as the error.
pub fn render(path: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> Result<String, String> {
    let mut out = String::with_capacity(path.len());
    let mut last = 0;
    for whole in PLACEHOLDER_RE.find_iter(path) {
        let name = &path[whole.start() + 1..whole.end() - 1];
        let value = lookup(name).ok_or_else(|| name.to_string())?;
        out.push_str(&path[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&path[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_reports_first_missing_name() {
        let err = render("/p/{a}/w/{b}", |n| (n == "a").then(|| "x".to_string())).unwrap_err();
        assert_eq!(err, "b");
        let ok = render("/p/{a}/w", |_| Some("1".to_string())).unwrap();
        assert_eq!(ok, "/p/1/w");
    }

    #[test]
    fn version_segment_is_replaced() {
        assert_eq!(path_version("/v1/widgets"), Some("v1"));
        assert_eq!(path_version("/v2beta1/widgets"), Some("v2beta1"));
        assert_eq!(path_version("/widgets/v1"), None);
        assert_eq!(with_version("/v1/widgets/{id}", "v2").as_deref(), Some("/v2/widgets/{id}"));
        assert_eq!(with_version("/widgets", "v2"), None);
    }

    #[test]
    fn segment_placeholder_requires_whole_segment() {
        assert_eq!(segment_placeholder("{id}"), Some("id"));
        assert_eq!(segment_placeholder("item-{id}"), None);
        assert_eq!(segment_placeholder("widgets"), None);
    }
}
