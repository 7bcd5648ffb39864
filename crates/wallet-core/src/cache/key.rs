use std::fmt;

/// Hierarchical cache key: a resource kind followed by id or filter parts.
///
/// Invalidation matches on prefixes, so `["transactions"]` covers every
/// `["transactions", <filters>]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Append one part.
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// The leading part, e.g. `transactions`.
    pub fn kind(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Whether `prefix` matches this key part-for-part.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_whole_parts_only() {
        let list = QueryKey::new(["transactions", "type=expense"]);
        assert!(list.starts_with(&QueryKey::new(["transactions"])));
        assert!(list.starts_with(&list));

        let single = QueryKey::new(["transaction", "t1"]);
        assert!(!single.starts_with(&QueryKey::new(["transactions"])));
        assert!(!QueryKey::new(["transactions"]).starts_with(&list));
    }

    #[test]
    fn display_joins_parts() {
        let key = QueryKey::new(["summary"]).with("2024-01-01").with("");
        assert_eq!(key.to_string(), "summary/2024-01-01/");
        assert_eq!(key.kind(), Some("summary"));
    }
}
