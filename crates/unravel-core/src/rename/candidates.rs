//! Candidate name collection and ranking.
//!
//! Candidates are strings the program itself carries that look like real
//! names: identifier-shaped string literals, plain-identifier member keys,
//! and class declaration names.

use indexmap::IndexMap;
use swc_ecma_ast::{ClassDecl, Program, Prop, PropName, Str};
use swc_ecma_visit::{Visit, VisitWith};

use super::names::{is_candidate_shape, is_valid_identifier};

/// Weight of one identifier-shaped string literal.
pub const LITERAL_WEIGHT: u32 = 1;
/// Weight of one plain-identifier object or class member key.
pub const KEY_WEIGHT: u32 = 1;
/// Weight of one class declaration name.
pub const CLASS_WEIGHT: u32 = 2;

/// Frequency table of candidate names, in first-seen order.
///
/// Weights only ever accumulate; no entry is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateTable {
    counts: IndexMap<String, u32>,
}

impl CandidateTable {
    /// Walk `program` once and tally every candidate occurrence.
    #[must_use]
    pub fn collect(program: &Program) -> Self {
        let mut table = Self::default();
        program.visit_with(&mut Collector { table: &mut table });
        table
    }

    /// Add `weight` to `name`, inserting it at the end if unseen.
    pub fn add(&mut self, name: &str, weight: u32) {
        if let Some(count) = self.counts.get_mut(name) {
            *count += weight;
        } else {
            self.counts.insert(name.to_string(), weight);
        }
    }

    /// Accumulated weight of `name`.
    #[must_use]
    pub fn weight(&self, name: &str) -> Option<u32> {
        self.counts.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Names by descending weight, ties in first-seen order, at most `limit`.
    #[must_use]
    pub fn ranked(&self, limit: usize) -> Vec<String> {
        let mut entries: Vec<(&String, u32)> =
            self.counts.iter().map(|(name, count)| (name, *count)).collect();
        // Stable sort keeps first-seen order among equal weights.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .take(limit)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

struct Collector<'a> {
    table: &'a mut CandidateTable,
}

impl Visit for Collector<'_> {
    fn visit_str(&mut self, n: &Str) {
        if is_candidate_shape(&n.value) {
            self.table.add(&n.value, LITERAL_WEIGHT);
        }
    }

    fn visit_prop_name(&mut self, n: &PropName) {
        if let PropName::Ident(key) = n {
            self.table.add(&key.sym, KEY_WEIGHT);
        }
        n.visit_children_with(self);
    }

    fn visit_prop(&mut self, n: &Prop) {
        // `{ name }` carries its key as a binding identifier
        if let Prop::Shorthand(key) = n {
            self.table.add(&key.sym, KEY_WEIGHT);
        }
        n.visit_children_with(self);
    }

    fn visit_class_decl(&mut self, n: &ClassDecl) {
        self.table.add(&n.ident.sym, CLASS_WEIGHT);
        n.visit_children_with(self);
    }
}

/// Produces the ordered candidate list that obfuscated names are paired with.
///
/// The substitution pass only sees the resulting mapping, so a different
/// scoring strategy can be dropped in here without touching it.
pub trait NameRanker {
    /// Candidates in rank order, best first.
    fn rank(&self, program: &Program) -> Vec<String>;
}

/// Ranks candidates by accumulated [`CandidateTable`] weight.
#[derive(Debug, Clone)]
pub struct FrequencyRanker {
    /// Maximum number of candidates kept.
    pub limit: usize,
    /// Drop candidates that cannot be emitted as a binding name.
    pub valid_names_only: bool,
}

impl Default for FrequencyRanker {
    fn default() -> Self {
        Self {
            limit: super::DEFAULT_MAX_CANDIDATES,
            valid_names_only: false,
        }
    }
}

impl FrequencyRanker {
    /// Rank an already-collected table.
    #[must_use]
    pub fn rank_table(&self, table: &CandidateTable) -> Vec<String> {
        if !self.valid_names_only {
            return table.ranked(self.limit);
        }
        table
            .ranked(usize::MAX)
            .into_iter()
            .filter(|name| is_valid_identifier(name))
            .take(self.limit)
            .collect()
    }
}

impl NameRanker for FrequencyRanker {
    fn rank(&self, program: &Program) -> Vec<String> {
        self.rank_table(&CandidateTable::collect(program))
    }
}
