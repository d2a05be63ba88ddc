use indexmap::IndexMap;

use super::detect::ObfuscatedSet;

/// Obfuscated name → candidate name, paired positionally.
///
/// The pairing carries no semantic link between a short name and the
/// candidate it receives. Names outside the domain are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMapping {
    pairs: IndexMap<String, String>,
}

impl RenameMapping {
    /// Zip `set` (discovery order) with `ranking` (rank order), truncated to
    /// the shorter of the two.
    #[must_use]
    pub fn build(ranking: &[String], set: &ObfuscatedSet) -> Self {
        let pairs = set
            .iter()
            .zip(ranking)
            .map(|(from, to)| (from.to_string(), to.clone()))
            .collect();
        Self { pairs }
    }

    /// The candidate assigned to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    fn set(source: &str) -> ObfuscatedSet {
        let tree = SourceTree::parse("m.js", source).unwrap();
        ObfuscatedSet::collect(tree.program(), &std::collections::HashSet::new())
    }

    fn ranking(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_pairs_positionally() {
        let m = RenameMapping::build(&ranking(&["first", "second"]), &set("a; b;"));
        assert_eq!(m.get("a"), Some("first"));
        assert_eq!(m.get("b"), Some("second"));
        assert_eq!(m.get("c"), None);
    }

    #[test]
    fn test_domain_is_shorter_sequence() {
        let m = RenameMapping::build(&ranking(&["only"]), &set("a; b; c;"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("b"), None);

        let m = RenameMapping::build(&ranking(&["one1", "two2", "three"]), &set("a;"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![("a", "one1")]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(RenameMapping::build(&[], &set("a;")).is_empty());
        assert!(RenameMapping::build(&ranking(&["name"]), &set("")).is_empty());
    }
}
