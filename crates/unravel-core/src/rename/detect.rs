use std::collections::HashSet;

use indexmap::IndexSet;
use swc_ecma_ast::{Ident, Program};
use swc_ecma_visit::{Visit, VisitWith};

use super::names::is_obfuscated_name;

/// Distinct obfuscated identifier names, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObfuscatedSet {
    names: IndexSet<String>,
}

impl ObfuscatedSet {
    /// Walk every identifier reference in `program` once.
    ///
    /// Property keys and member property names are not references and are
    /// never considered. Names in `reserved` are skipped.
    #[must_use]
    pub fn collect(program: &Program, reserved: &HashSet<String>) -> Self {
        let mut detector = Detector {
            set: Self::default(),
            reserved,
        };
        program.visit_with(&mut detector);
        detector.set
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

struct Detector<'a> {
    set: ObfuscatedSet,
    reserved: &'a HashSet<String>,
}

impl Visit for Detector<'_> {
    fn visit_ident(&mut self, n: &Ident) {
        let name: &str = &n.sym;
        if is_obfuscated_name(name) && !self.reserved.contains(name) && !self.set.contains(name) {
            self.set.names.insert(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    fn detect(source: &str, reserved: &[&str]) -> Vec<String> {
        let tree = SourceTree::parse("d.js", source).unwrap();
        let reserved = reserved.iter().map(ToString::to_string).collect();
        ObfuscatedSet::collect(tree.program(), &reserved)
            .iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_discovery_order_and_dedup() {
        let names = detect("var b = 1; function a(c) { return b + c + a; }", &[]);
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_property_keys_and_members_are_ignored() {
        let names = detect("var o = { k: 1 }; o.p = o.k; class Z { m() {} }", &[]);
        assert_eq!(names, vec!["o", "Z"]);
    }

    #[test]
    fn test_long_names_are_not_flagged() {
        let names = detect("var counter = 0; var _0x3c4d = 1;", &[]);
        assert!(names.is_empty());
    }

    #[test]
    fn test_reserved_names_are_skipped() {
        let names = detect("var a = Math.max(b, 1);", &["Math"]);
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_program() {
        assert!(detect("", &[]).is_empty());
    }
}
