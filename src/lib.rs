//! device-shell - an interactive declarative-configuration shell
//!
//! Walks a filesystem tree rooted at a libexec directory to discover a
//! namespace of containers, commands, and builtins; tokenizes operator
//! input in a shell-like quoting grammar; resolves argv against that
//! namespace; and dispatches to builtins or spawns external commands.
//!
//! A companion setter validates and atomically persists typed `name=value`
//! pairs into the sysconf tree (see [`setter`]).

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod namespace;
pub mod process;
pub mod setter;
pub mod shell;
pub mod tokenizer;
pub mod userdb;

pub use config::ShellConfig;
pub use error::ShellError;
pub use fs::{FileSystem, FsError};
pub use namespace::{NodeArena, NodeId, ParseNode};
pub use shell::Shell;
pub use tokenizer::{tokenize, OffsetRec, TokenizerState};
