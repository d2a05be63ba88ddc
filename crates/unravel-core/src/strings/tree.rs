//! Tree-level detection of string tables, decoders and their call sites.
//!
//! Matches declaration and call shapes on the parsed program, so formatting
//! and minor syntactic variation do not matter and every table/decoder pair
//! in the file is found.

use std::collections::HashSet;

use swc_ecma_ast::{
    ArrowExpr, AssignOp, AssignTarget, BinaryOp, BlockStmtOrExpr, CallExpr, Callee, Class, Decl,
    Expr, Function, Ident, Lit, MemberProp, Pat, ReturnStmt, SimpleAssignTarget, Stmt, VarDecl,
};
use swc_ecma_visit::{Visit, VisitWith};

use super::model::{integer_value, Binding, CallSite, Decoder, Detection, Reference, StringTable};
use crate::syntax::SourceTree;

/// Run both passes over `tree`.
///
/// Bindings are told apart by scope, so `tree` must have had
/// [`SourceTree::resolve_bindings`] applied.
pub(crate) fn detect(tree: &SourceTree) -> Detection {
    let mut decls = DeclFinder {
        tree,
        tables: Vec::new(),
        decoders: Vec::new(),
    };
    tree.program().visit_with(&mut decls);

    let tables: HashSet<&Binding> = decls.tables.iter().map(|t| &t.binding).collect();
    let decoders: Vec<Decoder> = decls
        .decoders
        .into_iter()
        .filter(|d| tables.contains(&d.table))
        .collect();

    let mut uses = UseFinder {
        tree,
        decoders: decoders.iter().map(|d| d.binding.clone()).collect(),
        bindings: decoders
            .iter()
            .flat_map(|d| [d.binding.clone(), d.table.clone()])
            .collect(),
        calls: Vec::new(),
        references: Vec::new(),
    };
    if !decoders.is_empty() {
        tree.program().visit_with(&mut uses);
    }

    Detection {
        tables: decls.tables,
        decoders,
        calls: uses.calls,
        references: uses.references,
    }
}

fn binding(id: &Ident) -> Binding {
    Binding::new(id.sym.to_string(), id.ctxt.as_u32())
}

/// First pass: table declarations and decoder-shaped functions.
struct DeclFinder<'a> {
    tree: &'a SourceTree,
    tables: Vec<StringTable>,
    /// Decoder candidates; their indexed binding is checked against the tables later.
    decoders: Vec<Decoder>,
}

impl DeclFinder<'_> {
    fn push_decoder(&mut self, name: &Ident, found: Option<(Binding, i64)>, stmt: &Stmt) {
        if let Some((table, offset)) = found {
            self.decoders.push(Decoder {
                binding: binding(name),
                table,
                offset,
                decl: self.tree.range_of(stmt),
            });
        }
    }

    fn var_decl(&mut self, var: &VarDecl, stmt: &Stmt) {
        let [decl] = var.decls.as_slice() else {
            return;
        };
        let (Pat::Ident(name), Some(init)) = (&decl.name, &decl.init) else {
            return;
        };

        if let Some(values) = string_array(init) {
            self.tables.push(StringTable {
                binding: binding(&name.id),
                values,
                decl: self.tree.range_of(stmt),
            });
        } else {
            self.push_decoder(&name.id, function_like(init), stmt);
        }
    }
}

impl Visit for DeclFinder<'_> {
    fn visit_stmt(&mut self, n: &Stmt) {
        match n {
            Stmt::Decl(Decl::Var(var)) => self.var_decl(var, n),
            Stmt::Decl(Decl::Fn(f)) => self.push_decoder(&f.ident, indexed_return(&f.function), n),
            Stmt::Expr(stmt) => {
                if let Expr::Assign(assign) = &*stmt.expr {
                    if let (AssignOp::Assign, AssignTarget::Simple(SimpleAssignTarget::Ident(b))) =
                        (assign.op, &assign.left)
                    {
                        self.push_decoder(&b.id, function_like(&assign.right), n);
                    }
                }
            }
            _ => {}
        }
        n.visit_children_with(self);
    }
}

/// Second pass: decoder calls and every occurrence of a table/decoder binding.
struct UseFinder<'a> {
    tree: &'a SourceTree,
    decoders: HashSet<Binding>,
    bindings: HashSet<Binding>,
    calls: Vec<CallSite>,
    references: Vec<Reference>,
}

impl Visit for UseFinder<'_> {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if let Some((callee, arg)) = decoder_call(n, &self.decoders) {
            self.calls.push(CallSite {
                callee,
                arg,
                range: self.tree.range(n.span),
            });
        }
        n.visit_children_with(self);
    }

    fn visit_ident(&mut self, n: &Ident) {
        let found = binding(n);
        if self.bindings.contains(&found) {
            self.references.push(Reference {
                binding: found,
                range: self.tree.range(n.span),
            });
        }
    }
}

fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(p) => unparen(&p.expr),
        _ => expr,
    }
}

/// `[ "a", 'b', ... ]` with at least one element and nothing but string literals.
fn string_array(expr: &Expr) -> Option<Vec<String>> {
    let Expr::Array(array) = unparen(expr) else {
        return None;
    };
    if array.elems.is_empty() {
        return None;
    }
    array
        .elems
        .iter()
        .map(|elem| match elem {
            Some(elem) if elem.spread.is_none() => match &*elem.expr {
                Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Function or arrow expression whose body returns `T[param - OFFSET]`.
fn function_like(expr: &Expr) -> Option<(Binding, i64)> {
    match unparen(expr) {
        Expr::Fn(f) => indexed_return(&f.function),
        Expr::Arrow(arrow) => arrow_indexed_return(arrow),
        _ => None,
    }
}

fn param_names<'p>(pats: impl Iterator<Item = &'p Pat>) -> Vec<&'p str> {
    pats.filter_map(|pat| match pat {
        Pat::Ident(b) => Some(&*b.id.sym),
        _ => None,
    })
    .collect()
}

fn indexed_return(function: &Function) -> Option<(Binding, i64)> {
    let params = param_names(function.params.iter().map(|p| &p.pat));
    let body = function.body.as_ref()?;
    let mut finder = ReturnFinder {
        params: &params,
        found: None,
    };
    body.visit_with(&mut finder);
    finder.found
}

fn arrow_indexed_return(arrow: &ArrowExpr) -> Option<(Binding, i64)> {
    let params = param_names(arrow.params.iter());
    match &*arrow.body {
        BlockStmtOrExpr::Expr(expr) => indexed_access(expr, &params),
        BlockStmtOrExpr::BlockStmt(block) => {
            let mut finder = ReturnFinder {
                params: &params,
                found: None,
            };
            block.visit_with(&mut finder);
            finder.found
        }
    }
}

/// Finds the first `return T[param - OFFSET]` in one function body.
struct ReturnFinder<'a> {
    params: &'a [&'a str],
    found: Option<(Binding, i64)>,
}

impl Visit for ReturnFinder<'_> {
    fn visit_return_stmt(&mut self, n: &ReturnStmt) {
        if self.found.is_none() {
            if let Some(arg) = &n.arg {
                self.found = indexed_access(arg, self.params);
            }
        }
    }

    // Nested functions have their own parameters.
    fn visit_function(&mut self, _: &Function) {}
    fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}
    fn visit_class(&mut self, _: &Class) {}
}

/// `T[param - OFFSET]` → `(T, OFFSET)`.
fn indexed_access(expr: &Expr, params: &[&str]) -> Option<(Binding, i64)> {
    let Expr::Member(member) = unparen(expr) else {
        return None;
    };
    let Expr::Ident(table) = unparen(&member.obj) else {
        return None;
    };
    let MemberProp::Computed(index) = &member.prop else {
        return None;
    };
    let Expr::Bin(bin) = unparen(&index.expr) else {
        return None;
    };
    if bin.op != BinaryOp::Sub {
        return None;
    }
    let Expr::Ident(param) = unparen(&bin.left) else {
        return None;
    };
    if !params.contains(&&*param.sym) {
        return None;
    }
    let Expr::Lit(Lit::Num(offset)) = unparen(&bin.right) else {
        return None;
    };
    Some((binding(table), integer_value(offset.value)?))
}

/// `decoder(N)`: one non-spread integer literal argument.
fn decoder_call(call: &CallExpr, decoders: &HashSet<Binding>) -> Option<(Binding, i64)> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(name) = unparen(callee) else {
        return None;
    };
    let callee = binding(name);
    if !decoders.contains(&callee) {
        return None;
    }
    let [arg] = call.args.as_slice() else {
        return None;
    };
    if arg.spread.is_some() {
        return None;
    }
    let Expr::Lit(Lit::Num(n)) = unparen(&arg.expr) else {
        return None;
    };
    Some((callee, integer_value(n.value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Detection {
        let mut tree = SourceTree::parse("t.js", source).unwrap();
        tree.resolve_bindings();
        detect(&tree)
    }

    #[test]
    fn test_function_declaration_decoder() {
        let source = "var _0x1a2b=['foo','bar','baz']; function _0x3c4d(a){return _0x1a2b[a-0x0];} console.log(_0x3c4d(0x1));";
        let d = run(source);

        assert_eq!(d.tables.len(), 1);
        assert_eq!(d.tables[0].binding.name, "_0x1a2b");
        assert_eq!(d.tables[0].values, vec!["foo", "bar", "baz"]);
        assert_eq!(
            source[d.tables[0].decl.clone()].trim_end_matches(';'),
            "var _0x1a2b=['foo','bar','baz']"
        );

        assert_eq!(d.decoders.len(), 1);
        assert_eq!(d.decoders[0].binding.name, "_0x3c4d");
        assert_eq!(d.decoders[0].table, d.tables[0].binding);
        assert_eq!(d.decoders[0].offset, 0);
        assert_eq!(
            &source[d.decoders[0].decl.clone()],
            "function _0x3c4d(a){return _0x1a2b[a-0x0];}"
        );

        assert_eq!(d.calls.len(), 1);
        assert_eq!(d.calls[0].arg, 1);
        assert_eq!(&source[d.calls[0].range.clone()], "_0x3c4d(0x1)");
    }

    #[test]
    fn test_assigned_function_and_arrow_decoders() {
        let d = run(
            "var t = ['x', 'y'];\n\
             var dec;\n\
             dec = function (i) { var k = i; return t[i - 0x10]; };\n\
             const dec2 = (n) => t[n - 3];\n",
        );
        let found: Vec<(&str, i64)> = d
            .decoders
            .iter()
            .map(|d| (d.binding.name.as_str(), d.offset))
            .collect();
        assert_eq!(found, vec![("dec", 16), ("dec2", 3)]);
    }

    #[test]
    fn test_index_must_use_a_parameter() {
        let d = run("var t = ['x']; function f(a) { return t[b - 1]; }");
        assert!(d.decoders.is_empty());
    }

    #[test]
    fn test_nested_function_return_is_not_the_decoder_body() {
        let d = run("var t = ['x']; function f(a) { return function (a) { return t[a - 1]; }; }");
        assert!(d.decoders.iter().all(|d| d.binding.name != "f"));
    }

    #[test]
    fn test_decoder_needs_a_known_table() {
        let d = run("function f(a) { return other[a - 1]; } f(1);");
        assert!(d.decoders.is_empty());
        assert!(d.calls.is_empty());
    }

    #[test]
    fn test_array_with_non_strings_is_not_a_table() {
        let d = run("var t = ['a', 1]; var u = []; var v = ['a', ...w];");
        assert!(d.tables.is_empty());
    }

    #[test]
    fn test_multi_declarator_is_not_a_table() {
        let d = run("var t = ['a'], u = 1;");
        assert!(d.tables.is_empty());
    }

    #[test]
    fn test_calls_need_single_integer_literal() {
        let d = run(
            "var t = ['a', 'b']; function f(a) { return t[a - 0]; }\n\
             f(1); f(x); f(1, 2); f(1.5); f(...y); f(0x0);",
        );
        let args: Vec<i64> = d.calls.iter().map(|c| c.arg).collect();
        assert_eq!(args, vec![1, 0]);
    }

    #[test]
    fn test_references_cover_table_and_decoder_names() {
        let d = run("var t = ['a']; function f(a) { return t[a - 0]; } var g = f; f(0);");
        let names: Vec<&str> = d.references.iter().map(|r| r.binding.name.as_str()).collect();
        assert_eq!(names, vec!["t", "f", "t", "f", "f"]);
    }

    #[test]
    fn test_multiple_pairs() {
        let d = run(
            "var t1 = ['a']; var t2 = ['b'];\n\
             function f1(a) { return t1[a - 0]; }\n\
             function f2(a) { return t2[a - 5]; }\n\
             f1(0); f2(5);",
        );
        assert_eq!(d.decoders.len(), 2);
        assert_eq!(d.calls.len(), 2);
    }

    #[test]
    fn test_same_decoder_name_in_two_functions() {
        let d = run(
            "function w1(){ var t1=['a']; function d(i){return t1[i-0];} return d(0); }\n\
             function w2(){ var t2=['b']; function d(i){return t2[i-0];} return d(0); }",
        );
        assert_eq!(d.decoders.len(), 2);
        assert_ne!(d.decoders[0].binding, d.decoders[1].binding);
        assert_eq!(d.calls.len(), 2);
        assert_eq!(d.calls[0].callee, d.decoders[0].binding);
        assert_eq!(d.calls[1].callee, d.decoders[1].binding);
    }

    #[test]
    fn test_same_table_name_in_two_scopes() {
        let d = run(
            "(function(){ var t=['a','b']; function d(i){return t[i-0];} log(d(1)); })();\n\
             (function(){ var t=['x','y']; function e(i){return t[i-0];} log(e(1)); })();",
        );
        assert_eq!(d.tables.len(), 2);
        assert_ne!(d.tables[0].binding, d.tables[1].binding);
        assert_eq!(d.decoders[0].table, d.tables[0].binding);
        assert_eq!(d.decoders[1].table, d.tables[1].binding);
    }

    #[test]
    fn test_shadowed_name_is_not_a_call_site() {
        let source = "var t = ['a']; function d(i) { return t[i - 0]; }\n\
                      function other(d) { return d(0); }\n\
                      d(0);";
        let d = run(source);
        assert_eq!(d.calls.len(), 1);
        assert_eq!(d.calls[0].range.start, source.rfind("d(0)").unwrap());
    }
}
