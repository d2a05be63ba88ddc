//! Syntax tree facade over SWC.
//!
//! Parses one source file into a mutable [`Program`], re-serializes it with
//! comments kept, and maps node spans back to byte ranges of the original
//! text. The rest of unravel never touches SWC's source map or lexer
//! directly.
//!
//! ## Usage
//!
//! ```ignore
//! use unravel_core::syntax::SourceTree;
//!
//! let mut tree = SourceTree::parse("app.js", "var a = 1;")?;
//! // ... mutate tree.program_mut() ...
//! let code = tree.emit()?;
//! ```

#![allow(clippy::default_trait_access)]

use std::fmt;
use std::ops::Range;

use swc_common::comments::SingleThreadedComments;
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, Globals, Mark, SourceFile, SourceMap, Span, Spanned, GLOBALS};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};
use swc_ecma_transforms_base::resolver;
use swc_ecma_visit::VisitMutWith;

use crate::error::Error;

/// A source file that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// File name as given to [`SourceTree::parse`].
    pub file: String,
    /// Parser message.
    pub message: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

impl SyntaxError {
    fn from_parser(cm: &SourceMap, file: &str, err: &swc_ecma_parser::error::Error) -> Self {
        let loc = cm.lookup_char_pos(err.span().lo);
        Self {
            file: file.to_string(),
            message: err.kind().msg().into_owned(),
            line: loc.line,
            column: loc.col_display + 1,
        }
    }
}

/// A parsed, mutable JavaScript program tied to its original text.
pub struct SourceTree {
    cm: Lrc<SourceMap>,
    fm: Lrc<SourceFile>,
    comments: SingleThreadedComments,
    program: Program,
}

impl fmt::Debug for SourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTree")
            .field("file", &self.fm.name)
            .field("len", &self.fm.src.len())
            .finish_non_exhaustive()
    }
}

impl SourceTree {
    /// Parse `source` as the latest ECMAScript edition.
    ///
    /// The parser decides between script and module goal. Errors the parser
    /// recovers from are still reported: a tree built around them would not
    /// re-serialize faithfully.
    pub fn parse(file_name: &str, source: &str) -> Result<Self, SyntaxError> {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(file_name.to_string())),
            source.to_string(),
        );
        let comments = SingleThreadedComments::default();

        let (result, recovered) = {
            let lexer = Lexer::new(
                Syntax::Es(EsSyntax::default()),
                EsVersion::EsNext,
                StringInput::from(&*fm),
                Some(&comments),
            );
            let mut parser = Parser::new_from(lexer);
            let result = parser.parse_program();
            (result, parser.take_errors())
        };

        let program = result.map_err(|e| SyntaxError::from_parser(&cm, file_name, &e))?;
        if let Some(e) = recovered.first() {
            return Err(SyntaxError::from_parser(&cm, file_name, e));
        }

        Ok(Self {
            cm,
            fm,
            comments,
            program,
        })
    }

    /// The parsed program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The parsed program, for in-place rewriting.
    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    /// Tag every identifier with the scope of the declaration it refers to.
    ///
    /// Afterwards two `Ident`s name the same binding exactly when their
    /// `to_id()` pairs are equal. Identifiers with no declaration in the
    /// file share one unresolved context.
    pub fn resolve_bindings(&mut self) {
        GLOBALS.set(&Globals::default(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            self.program
                .visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));
        });
    }

    /// The text the tree was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.fm.src
    }

    /// Byte range of `span` in the original text.
    #[must_use]
    pub fn range(&self, span: Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    /// Byte range of any node in the original text.
    #[must_use]
    pub fn range_of<N: Spanned>(&self, node: &N) -> Range<usize> {
        self.range(node.span())
    }

    fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.fm.start_pos.0) as usize
    }

    /// Re-serialize the program, keeping comments.
    pub fn emit(&self) -> Result<String, Error> {
        let mut buf = Vec::new();

        {
            let writer = JsWriter::new(self.cm.clone(), "\n", &mut buf, None);

            let mut emitter = Emitter {
                cfg: swc_ecma_codegen::Config::default()
                    .with_minify(false)
                    .with_target(EsVersion::EsNext),
                cm: self.cm.clone(),
                comments: Some(&self.comments),
                wr: writer,
            };

            match &self.program {
                Program::Module(module) => emitter.emit_module(module),
                Program::Script(script) => emitter.emit_script(script),
            }
            .map_err(|e| Error::Emit(e.to_string()))?;
        }

        String::from_utf8(buf).map_err(|e| Error::Emit(format!("Invalid UTF-8 output: {e}")))
    }
}
