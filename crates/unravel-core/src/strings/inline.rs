//! Turns a [`Detection`] into text edits and splices them into the source.

use std::collections::HashSet;
use std::ops::Range;

use serde::Serialize;

use super::model::{contains, Binding, Detection};
use super::StripPolicy;

/// Per table/decoder pair result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairSummary {
    pub table: String,
    pub decoder: String,
    pub offset: i64,
    /// Number of strings in the table.
    pub entries: usize,
    /// Call sites replaced by a literal.
    pub replaced: usize,
    /// Call sites left as-is because the index was out of range.
    pub skipped: usize,
    pub decoder_stripped: bool,
    pub table_stripped: bool,
}

/// Replace `range` of the source with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub edits: Vec<Edit>,
    pub pairs: Vec<PairSummary>,
}

impl Plan {
    pub fn replaced(&self) -> usize {
        self.pairs.iter().map(|p| p.replaced).sum()
    }

    pub fn skipped(&self) -> usize {
        self.pairs.iter().map(|p| p.skipped).sum()
    }
}

/// Compute the replacements and removals for every detected pair.
///
/// Calls, references and tables are matched to a decoder by binding, and
/// each call site is replaced at most once.
pub(crate) fn plan(source: &str, detection: &Detection, policy: StripPolicy) -> Plan {
    let decls: Vec<&Range<usize>> = detection
        .tables
        .iter()
        .map(|t| &t.decl)
        .chain(detection.decoders.iter().map(|d| &d.decl))
        .collect();

    let mut plan = Plan::default();
    let mut replaced: HashSet<Range<usize>> = HashSet::new();
    let mut stripped: Vec<Range<usize>> = Vec::new();
    // table binding of each entry in `plan.pairs`
    let mut pair_tables: Vec<&Binding> = Vec::new();

    for decoder in &detection.decoders {
        let Some(table) = detection.table(&decoder.table) else {
            continue;
        };
        let mut summary = PairSummary {
            table: table.binding.name.clone(),
            decoder: decoder.binding.name.clone(),
            offset: decoder.offset,
            entries: table.values.len(),
            replaced: 0,
            skipped: 0,
            decoder_stripped: false,
            table_stripped: false,
        };

        let calls = detection
            .calls
            .iter()
            .filter(|c| c.callee == decoder.binding)
            .filter(|c| !decls.iter().any(|d| contains(d, &c.range)));
        for call in calls {
            if replaced.contains(&call.range) {
                continue;
            }
            let literal = table
                .lookup(call.arg, decoder.offset)
                .and_then(|value| serde_json::to_string(value).ok());
            if let Some(text) = literal {
                plan.edits.push(Edit {
                    range: call.range.clone(),
                    text,
                });
                replaced.insert(call.range.clone());
                summary.replaced += 1;
            } else {
                summary.skipped += 1;
            }
        }

        summary.decoder_stripped = match policy {
            StripPolicy::OnDecoderMatch => true,
            StripPolicy::Unreferenced => {
                summary.replaced > 0
                    && !detection.references.iter().any(|r| {
                        r.binding == decoder.binding
                            && !contains(&decoder.decl, &r.range)
                            && !replaced.iter().any(|c| contains(c, &r.range))
                    })
            }
        };
        if summary.decoder_stripped {
            stripped.push(decoder.decl.clone());
        }
        plan.pairs.push(summary);
        pair_tables.push(&decoder.table);
    }

    let mut removed_tables: Vec<&Range<usize>> = Vec::new();
    for table in &detection.tables {
        let owner_stripped = pair_tables
            .iter()
            .zip(&plan.pairs)
            .any(|(t, p)| **t == table.binding && p.decoder_stripped);
        if !owner_stripped || removed_tables.contains(&&table.decl) {
            continue;
        }
        let strip = match policy {
            StripPolicy::OnDecoderMatch => true,
            StripPolicy::Unreferenced => !detection.references.iter().any(|r| {
                r.binding == table.binding
                    && !contains(&table.decl, &r.range)
                    && !stripped.iter().any(|d| contains(d, &r.range))
            }),
        };
        if strip {
            removed_tables.push(&table.decl);
            stripped.push(table.decl.clone());
        }
    }
    for (binding, pair) in pair_tables.iter().zip(&mut plan.pairs) {
        pair.table_stripped = detection
            .table(binding)
            .is_some_and(|t| removed_tables.contains(&&t.decl));
    }

    for decl in &stripped {
        plan.edits.push(Edit {
            range: removal_range(source, decl),
            text: String::new(),
        });
    }
    plan
}

/// Extend a declaration's range over its trailing `;`, blanks and line end,
/// and over its indentation when it sat on its own line.
fn removal_range(source: &str, decl: &Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();
    let skip_blanks = |mut i: usize| {
        while matches!(bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        i
    };

    let mut end = skip_blanks(decl.end);
    if bytes.get(end) == Some(&b';') {
        end = skip_blanks(end + 1);
    }
    let newline = match bytes.get(end) {
        Some(b'\n') => 1,
        Some(b'\r') if bytes.get(end + 1) == Some(&b'\n') => 2,
        _ => 0,
    };
    end += newline;

    let mut start = decl.start;
    if newline > 0 {
        let indent = source[..start].len() - source[..start].trim_end_matches([' ', '\t']).len();
        let line_start = start - indent;
        if line_start == 0 || bytes[line_start - 1] == b'\n' {
            start = line_start;
        }
    }
    start..end
}

/// Splice `edits` into `source`; an edit overlapping an earlier one is dropped.
pub(crate) fn apply(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| e.range.start);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
