//! Unified error type for the tokenizer, resolver, and dispatcher.
//!
//! Mirrors the shape of the teacher's `InterpreterError`: one struct per
//! failure kind, a `Display` impl per struct, and a sum type that `From`s
//! each one in. The C source this shell is modeled on mixes process exit
//! codes with library error codes; this collapses both into one
//! discriminated union, per the redesign note in the spec.

use std::fmt;

/// Byte offset into the source line where a tokenizer error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// The tokenizer could not interpret a byte (bad escape, unknown `\c` target).
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub byte_index: usize,
    pub pos: Option<SourcePos>,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "syntax error at byte {} ({}): {}", self.byte_index, pos, self.message),
            None => write!(f, "syntax error at byte {}: {}", self.byte_index, self.message),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// No descendant matched the token under the current parent node.
#[derive(Debug, Clone)]
pub struct NotFoundError {
    pub token: String,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not found: '{}'", self.token)
    }
}

impl std::error::Error for NotFoundError {}

/// `..` was attempted at the root container.
#[derive(Debug, Clone, Default)]
pub struct AboveRootError;

impl fmt::Display for AboveRootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "already at root")
    }
}

impl std::error::Error for AboveRootError {}

/// A validator rejected a value.
#[derive(Debug, Clone)]
pub struct InvalidValueError {
    pub value: String,
    pub reason: String,
}

impl fmt::Display for InvalidValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for InvalidValueError {}

/// Filesystem or pipe I/O failure underlying a higher-level operation.
#[derive(Debug, Clone)]
pub struct IoFailureError {
    pub message: String,
}

impl fmt::Display for IoFailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IoFailureError {}

impl From<std::io::Error> for IoFailureError {
    fn from(e: std::io::Error) -> Self {
        Self { message: e.to_string() }
    }
}

/// A spawned child exited abnormally or with non-zero status.
#[derive(Debug, Clone)]
pub struct ChildFailureError {
    pub exit_reason: String,
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl fmt::Display for ChildFailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "child {} (exit code {})", self.exit_reason, code),
            None => write!(f, "child {}", self.exit_reason),
        }
    }
}

impl std::error::Error for ChildFailureError {}

/// Completion context only: more than one candidate remains. Not a failure —
/// preserved as a distinct, non-fatal outcome (the source's `APR_INCOMPLETE`).
#[derive(Debug, Clone, Default)]
pub struct IncompleteError;

impl fmt::Display for IncompleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "incomplete: multiple candidates remain")
    }
}

impl std::error::Error for IncompleteError {}

/// Unified error enum for all shell-core operations.
#[derive(Debug, Clone)]
pub enum ShellError {
    Syntax(SyntaxError),
    NotFound(NotFoundError),
    AboveRoot(AboveRootError),
    Invalid(InvalidValueError),
    Incomplete(IncompleteError),
    IoFailure(IoFailureError),
    ChildFailure(ChildFailureError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Syntax(e) => write!(f, "{}", e),
            ShellError::NotFound(e) => write!(f, "{}", e),
            ShellError::AboveRoot(e) => write!(f, "{}", e),
            ShellError::Invalid(e) => write!(f, "{}", e),
            ShellError::Incomplete(e) => write!(f, "{}", e),
            ShellError::IoFailure(e) => write!(f, "{}", e),
            ShellError::ChildFailure(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ShellError {}

macro_rules! impl_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for ShellError {
            fn from(e: $ty) -> Self {
                ShellError::$variant(e)
            }
        }
    };
}

impl_from!(Syntax, SyntaxError);
impl_from!(NotFound, NotFoundError);
impl_from!(AboveRoot, AboveRootError);
impl_from!(Invalid, InvalidValueError);
impl_from!(Incomplete, IncompleteError);
impl_from!(IoFailure, IoFailureError);
impl_from!(ChildFailure, ChildFailureError);

impl From<std::io::Error> for ShellError {
    fn from(e: std::io::Error) -> Self {
        ShellError::IoFailure(IoFailureError::from(e))
    }
}

impl From<crate::fs::FsError> for ShellError {
    fn from(e: crate::fs::FsError) -> Self {
        ShellError::IoFailure(IoFailureError { message: e.to_string() })
    }
}
