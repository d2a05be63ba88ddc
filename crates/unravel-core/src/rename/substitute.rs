use swc_ecma_ast::{Ident, Program};
use swc_ecma_visit::{VisitMut, VisitMutWith};

use super::mapping::RenameMapping;

/// Rename, in place, every identifier whose name is a mapping key.
///
/// This is a global textual replacement, not a scope-aware rename: every
/// declaration and reference in every scope is rewritten, so two unrelated
/// bindings sharing a short name end up sharing the candidate, and no
/// collision check is made against existing names. Property keys and member
/// property names are not identifiers here and stay as they are.
///
/// Returns the number of identifier nodes rewritten.
pub fn substitute(program: &mut Program, mapping: &RenameMapping) -> usize {
    let mut pass = Substitution { mapping, count: 0 };
    program.visit_mut_with(&mut pass);
    pass.count
}

struct Substitution<'a> {
    mapping: &'a RenameMapping,
    count: usize,
}

impl VisitMut for Substitution<'_> {
    fn visit_mut_ident(&mut self, n: &mut Ident) {
        if let Some(name) = self.mapping.get(&n.sym) {
            n.sym = name.into();
            self.count += 1;
        }
    }
}
