//! DSL (Domain Specific Language) parser for circuit descriptions.
//!
//! This module provides a line-oriented, human-editable language for
//! describing flotation circuits: the units, the flow ids that connect them,
//! feed conditions, and the Monte Carlo and scenario settings that go with a
//! study.
//!
//! # Grammar Overview
//!
//! ```text
//! circuit     = { line }
//! line        = comment | directive | node | empty
//! comment     = ('#' | ';') { any_char }
//! directive   = '.' directive_name { argument }
//! node        = kind name "in" flow+ "out" flow+ { param }
//!
//! kind        = "cell" | "splitter" | "celda" | "mixer" | "sum" | "suma"
//! name        = identifier | string
//! flow        = integer
//! param       = identifier '=' number
//! string      = '"' { any_char_but_quote } '"'
//! number      = ['-'|'+'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+]
//! ```
//!
//! # Node Kinds
//!
//! | Kind | Ports | Parameters |
//! |------|-------|------------|
//! | cell | 1 in, 2 out (concentrate, reject) | `mass=`, `fine=` split factors |
//! | mixer | N in, 1 out | none |
//!
//! # Directives
//!
//! | Directive | Syntax |
//! |-----------|--------|
//! | .flow | `.flow <id> <name>` |
//! | .feed | `.feed <id> <mass> <grade>` |
//! | .discharge | `.discharge <id>...` |
//! | .passes | `.passes <n>` |
//! | .vary | `.vary <node> mass <lo> <hi> fine <lo> <hi>` |
//! | .trials | `.trials <n>` |
//! | .seed | `.seed <n>` |
//! | .grade | `.grade <min> <max>` (or `.grade_min`, `.grade_max`) |
//! | .ceiling | `.ceiling <grade>` |
//! | .selectivity | `.selectivity <node> <min> <max>` |
//! | .scenario | `.scenario <id> <node> mass=<x> fine=<y>` |
//!
//! # Example
//!
//! ```text
//! # Rougher with a recycled scavenger reject
//! .feed 1 100 1.5
//! .discharge 5
//!
//! cell  Rougher   in 1   out 2 3  mass=0.08 fine=0.70
//! mixer Mix       in 3 6 out 4
//! cell  Scavenger in 4   out 6 5  mass=0.25 fine=0.92
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a circuit DSL string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a circuit DSL file.
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::SplitFactorError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}
