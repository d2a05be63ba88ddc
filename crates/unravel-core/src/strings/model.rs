use std::ops::Range;

/// Identity of a declared name: its text plus the scope of its declaration.
///
/// Two occurrences of the same text in different scopes are different
/// bindings. Text-pattern detection has no scopes and uses `scope == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub name: String,
    pub scope: u32,
}

impl Binding {
    #[must_use]
    pub fn new(name: impl Into<String>, scope: u32) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    /// A binding found without scope information.
    #[must_use]
    pub fn unscoped(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }
}

/// An array-literal declaration holding only string constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    /// Declared variable.
    pub binding: Binding,
    /// Decoded values; index 0 is the first literal in source order.
    pub values: Vec<String>,
    /// Byte range of the whole declaration statement.
    pub decl: Range<usize>,
}

impl StringTable {
    /// `values[n - offset]`, if in range.
    #[must_use]
    pub fn lookup(&self, n: i64, offset: i64) -> Option<&str> {
        let idx = usize::try_from(n.checked_sub(offset)?).ok()?;
        self.values.get(idx).map(String::as_str)
    }
}

/// A function whose call `name(N)` denotes `table[N - offset]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    /// Function binding.
    pub binding: Binding,
    /// The table binding the body indexes.
    pub table: Binding,
    /// Subtracted from the argument before indexing.
    pub offset: i64,
    /// Byte range of the whole declaration statement.
    pub decl: Range<usize>,
}

/// `decoder(N)` with a single integer literal argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub callee: Binding,
    pub arg: i64,
    /// Byte range of the whole call expression.
    pub range: Range<usize>,
}

/// Any occurrence of a table or decoder binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub binding: Binding,
    pub range: Range<usize>,
}

/// Everything a detector found in one source text.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub tables: Vec<StringTable>,
    pub decoders: Vec<Decoder>,
    pub calls: Vec<CallSite>,
    pub references: Vec<Reference>,
}

impl Detection {
    /// The table declared as `binding`.
    #[must_use]
    pub fn table(&self, binding: &Binding) -> Option<&StringTable> {
        self.tables.iter().find(|t| &t.binding == binding)
    }

    /// Whether no decoder was located.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Whether `inner` lies entirely within `outer`.
pub(crate) fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Largest integer a JavaScript number represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A non-negative integral numeric literal value.
pub(crate) fn integer_value(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && (0.0..=MAX_SAFE_INTEGER).contains(&value))
        .then_some(value as i64)
}
