//! Error types for the splitfactor circuit simulator.
//!
//! This module provides a unified error type [`SplitFactorError`] that covers
//! every configuration problem that can be detected while parsing a circuit
//! description, building the circuit, or setting up a Monte Carlo run.
//!
//! Numerical trouble inside a single Monte Carlo trial is not an error: it is
//! reported as a rejected trial (see [`crate::solver::RejectReason`]).

use thiserror::Error;

/// Result type alias using [`SplitFactorError`].
pub type Result<T> = std::result::Result<T, SplitFactorError>;

/// Unified error type for all splitfactor operations.
#[derive(Error, Debug)]
pub enum SplitFactorError {
    // ============ DSL Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    // ============ Circuit Errors ============
    /// Node kind keyword is not a splitter or mixer
    #[error("Unknown node kind '{kind}' for node '{node}'")]
    UnknownNodeKind { node: String, kind: String },

    /// Node definition is structurally invalid (wrong port counts, bad parameters)
    #[error("Invalid node '{name}': {message}")]
    InvalidNode { name: String, message: String },

    /// Duplicate node name
    #[error("Duplicate node name '{name}'")]
    DuplicateNode { name: String },

    /// Node not found in circuit
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// Flow id not referenced by any node
    #[error("Flow {flow} not found in circuit")]
    FlowNotFound { flow: u32 },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Configuration Errors ============
    /// Monte Carlo target has no sampling range for one of its parameters
    #[error("Missing {param} range for target node '{node}'")]
    MissingRange { node: String, param: String },

    /// Sampling range is empty, reversed or non-finite
    #[error("Invalid {param} range [{low}, {high}) for node '{node}'")]
    InvalidRange {
        node: String,
        param: String,
        low: f64,
        high: f64,
    },

    /// Monte Carlo target is a node without parameters
    #[error("Target node '{node}' has no split parameters to sample")]
    NotASplitter { node: String },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ I/O Errors ============
    /// Error reading circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a report
    #[error("Report output error: {source}")]
    ReportError {
        #[from]
        source: std::io::Error,
    },
}

impl SplitFactorError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid node error
    pub fn invalid_node(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }
}
