//! The `Shell`: ties the tokenizer, resolver, and dispatcher together for
//! one line of input, and keeps the single piece of cross-invocation state
//! the spec allows — the saved navigation path (spec §5, Non-goals).

use crate::config::ShellConfig;
use crate::dispatch::{self, DispatchOutcome};
use crate::error::ShellError;
use crate::fs::FileSystem;
use crate::namespace::{Container, NodeArena, NodeId, ParseNode};
use crate::process::ProcessSpawner;
use crate::tokenizer::{tokenize, TokenizerState};

/// Line-source abstraction. The core doesn't implement the interactive
/// editing backends (history, key bindings) — those are a non-goal; this
/// trait is the contract a real binary's line editor satisfies.
pub trait LineSource {
    /// Returns `None` on end-of-input (e.g. Ctrl-D).
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Trivial stdin-based `LineSource` used when no richer editor backend is
/// configured.
pub struct StdinLineSource;

impl LineSource for StdinLineSource {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        use std::io::Write;
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        let mut buf = String::new();
        match std::io::stdin().read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => None,
        }
    }
}

/// Terminal save/restore around child invocation — a non-goal the core
/// only calls through, never implements. A no-op default is provided so
/// tests and simple batch callers don't need a real terminal.
pub trait TerminalGuard {
    fn save(&mut self) {}
    fn restore(&mut self) {}
}

pub struct NoopTerminalGuard;
impl TerminalGuard for NoopTerminalGuard {}

/// What happened after processing one line.
#[derive(Debug)]
pub enum LineOutcome {
    Navigated,
    Executed { exit_code: i32 },
    Diagnostic(String),
    EndOfInput,
}

pub struct Shell<'a> {
    fs: &'a dyn FileSystem,
    spawner: &'a dyn ProcessSpawner,
    config: ShellConfig,
    path: Vec<String>,
    base: String,
    user: String,
    host: String,
}

impl<'a> Shell<'a> {
    pub fn new(fs: &'a dyn FileSystem, spawner: &'a dyn ProcessSpawner, config: ShellConfig) -> Self {
        Shell {
            fs,
            spawner,
            config,
            path: Vec::new(),
            base: "device".to_string(),
            user: std::env::var("USER").unwrap_or_else(|_| "user".to_string()),
            host: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        }
    }

    pub fn prompt(&self) -> String {
        let path = if self.path.is_empty() { String::new() } else { self.path.join("/") };
        format!("{} {}@{} /{}> ", self.base, self.user, self.host, path)
    }

    fn root_container(&self) -> Result<Container, ShellError> {
        let (child_containers, child_commands) = list_root(self.fs, &self.config.libexec_root, &self.config.pathext)?;
        Ok(Container {
            libexec_path: self.config.libexec_root.clone(),
            sysconf_path: self.config.sysconf_root.clone(),
            child_containers,
            child_commands,
            builtins: vec!["exit".to_string(), "quit".to_string()],
        })
    }

    /// Rebuild a fresh arena rooted at the filesystem root, then walk it
    /// down through the saved path to find the node the next line should
    /// resolve against. Arenas are scoped to one call, per the resource
    /// model (spec §5); the saved path itself is plain string data so it
    /// survives past the arena's drop.
    fn rehydrate(&self) -> Result<(NodeArena, NodeId), ShellError> {
        let mut arena = NodeArena::new();
        let root = arena.alloc(ParseNode::Container(self.root_container()?), "/", None);
        let mut cur = root;
        for name in &self.path {
            cur = crate::namespace::parse_step(&mut arena, self.fs, self.spawner, &self.config, name, cur, false)?;
        }
        Ok((arena, cur))
    }

    /// Process one line: tokenize, resolve every argv element in sequence
    /// against the saved path, then dispatch the terminal node.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        let tokenized = match tokenize(line.as_bytes(), TokenizerState::default()) {
            Ok(t) => t,
            Err(e) => return LineOutcome::Diagnostic(format!("syntax error: {e}")),
        };
        if tokenized.argv.is_empty() {
            return LineOutcome::Navigated;
        }

        let (mut arena, start) = match self.rehydrate() {
            Ok(v) => v,
            Err(e) => return LineOutcome::Diagnostic(format!("{e}")),
        };

        let mut cur = start;
        for (idx, tok_bytes) in tokenized.argv.iter().enumerate() {
            let completion_mode = false;
            let token = String::from_utf8_lossy(tok_bytes).into_owned();
            match crate::namespace::parse_step(&mut arena, self.fs, self.spawner, &self.config, &token, cur, completion_mode) {
                Ok(next) => cur = next,
                Err(e) => {
                    let offset = tokenized.offsets.get(idx).cloned();
                    let (line_no, col) = offset.map(|o| (1, o.start)).unwrap_or((1, 0));
                    return LineOutcome::Diagnostic(format!("{e} (line {line_no} column {col})"));
                }
            }
        }

        let outcome = dispatch::dispatch(&arena, self.spawner, &self.config, cur, 1, 0);
        match outcome {
            Ok(DispatchOutcome::Navigated(chain)) => {
                self.path = chain.iter().skip(1).map(|id| arena.get(*id).name.clone()).collect();
                LineOutcome::Navigated
            }
            Ok(DispatchOutcome::Executed { exit_code }) => LineOutcome::Executed { exit_code },
            Ok(DispatchOutcome::EndOfInput) => LineOutcome::EndOfInput,
            Ok(DispatchOutcome::Ambiguous { message }) => LineOutcome::Diagnostic(message),
            Err(e) => LineOutcome::Diagnostic(format!("{e}")),
        }
    }

    /// Completion entry point (spec §6): tokenize `line` (truncated at
    /// `comp_point`, a byte offset, if given), resolve every token against
    /// the saved path with `completion_mode` set only on the last one, and
    /// return the candidate strings for whatever the last token partially
    /// names. Returns an empty list on any syntax or resolution error —
    /// completion never surfaces a diagnostic.
    pub fn complete_line(&self, line: &str, comp_point: Option<usize>) -> Vec<String> {
        let truncated = match comp_point {
            Some(point) => {
                let mut end = point.min(line.len());
                while end > 0 && !line.is_char_boundary(end) {
                    end -= 1;
                }
                &line[..end]
            }
            None => line,
        };

        let tokenized = match tokenize(truncated.as_bytes(), TokenizerState::default()) {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };

        let (mut arena, start) = match self.rehydrate() {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };

        let mut argv: Vec<String> = tokenized.argv.iter().map(|b| String::from_utf8_lossy(b).into_owned()).collect();
        if !tokenized.final_state.in_token {
            argv.push(String::new());
        }

        let last = argv.len() - 1;
        let mut cur = start;
        for (idx, token) in argv.iter().enumerate() {
            let completion_mode = idx == last;
            match crate::namespace::parse_step(&mut arena, self.fs, self.spawner, &self.config, token, cur, completion_mode) {
                Ok(next) => cur = next,
                Err(_) => return Vec::new(),
            }
        }

        candidates_for_node(&arena, cur)
    }

    /// Interactive loop: read lines from `source` until end-of-input or
    /// `exit`/`quit`.
    pub fn run_interactive(&mut self, source: &mut dyn LineSource, terminal: &mut dyn TerminalGuard) {
        loop {
            let Some(line) = source.read_line(&self.prompt()) else {
                break;
            };
            terminal.save();
            match self.process_line(&line) {
                LineOutcome::EndOfInput => {
                    terminal.restore();
                    break;
                }
                LineOutcome::Diagnostic(msg) => eprintln!("{msg}"),
                LineOutcome::Navigated | LineOutcome::Executed { .. } => {}
            }
            terminal.restore();
        }
    }
}

/// Candidate strings for whatever `id` represents, derived from the node
/// the resolver left the completed token resting on.
fn candidates_for_node(arena: &NodeArena, id: NodeId) -> Vec<String> {
    let slot = arena.get(id);
    match &slot.node {
        ParseNode::Container(_) | ParseNode::Command(_) | ParseNode::Builtin(_) => {
            vec![format!("{}{}", slot.name, slot.node.completion_tail())]
        }
        ParseNode::Ambiguous(amb) => {
            let mut out: Vec<String> = amb.containers.iter().chain(amb.commands.iter()).chain(amb.builtins.iter()).map(|name| format!("{name} ")).collect();
            match slot.name.split_once('=') {
                Some((key, _)) => out.extend(amb.values.iter().map(|v| format!("{key}={v}"))),
                None => {
                    out.extend(amb.requires.iter().chain(amb.keys.iter()).map(|k| format!("{k}=")));
                    out.extend(amb.values.iter().cloned());
                }
            }
            out
        }
        ParseNode::Parameter(param) => {
            let token = slot.name.as_str();
            let mut out = Vec::new();
            match token.split_once('=') {
                Some((key, partial)) => out.extend(param.legal_values.iter().filter(|v| v.starts_with(partial)).map(|v| format!("{key}={v}"))),
                None => {
                    out.extend(param.required_keys.iter().chain(param.legal_keys.iter()).filter(|k| k.starts_with(token)).map(|k| format!("{k}=")));
                    out.extend(param.legal_values.iter().filter(|v| v.starts_with(token)).cloned());
                }
            }
            out
        }
        ParseNode::Option(_) => Vec::new(),
    }
}

fn list_root(fs: &dyn FileSystem, libexec_root: &str, pathext: &[String]) -> Result<(Vec<String>, Vec<String>), ShellError> {
    let mut containers = Vec::new();
    let mut commands = Vec::new();
    for entry in fs.read_dir(libexec_root)? {
        match entry.kind {
            crate::fs::EntryKind::Directory => containers.push(entry.name),
            _ => {
                let mut name = entry.name;
                for ext in pathext {
                    if let Some(stripped) = name.strip_suffix(ext.as_str()) {
                        name = stripped.to_string();
                        break;
                    }
                }
                commands.push(name);
            }
        }
    }
    containers.sort();
    commands.sort();
    Ok((containers, commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::process::{ExecResult, SpawnRequest};

    struct FakeSpawner;
    impl ProcessSpawner for FakeSpawner {
        fn spawn(&self, _request: &SpawnRequest) -> Result<ExecResult, ShellError> {
            Ok(ExecResult::default())
        }
        fn spawn_inherited(&self, _request: &SpawnRequest) -> Result<i32, ShellError> {
            Ok(0)
        }
    }

    #[test]
    fn navigating_into_a_container_updates_the_saved_path() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec/net");
        fs.seed_file("/libexec/net/show", b"#!/bin/sh\n");
        fs.seed_dir("/sysconf/net");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let mut shell = Shell::new(&fs, &spawner, config);

        match shell.process_line("net") {
            LineOutcome::Navigated => {}
            other => panic!("expected Navigated, got {other:?}"),
        }
        assert_eq!(shell.path, vec!["net".to_string()]);
        assert!(shell.prompt().contains("/net>"));
    }

    #[test]
    fn unknown_token_produces_a_diagnostic() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let mut shell = Shell::new(&fs, &spawner, config);
        match shell.process_line("bogus") {
            LineOutcome::Diagnostic(_) => {}
            other => panic!("expected Diagnostic, got {other:?}"),
        }
    }

    #[test]
    fn exit_builtin_ends_input() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let mut shell = Shell::new(&fs, &spawner, config);
        match shell.process_line("exit") {
            LineOutcome::EndOfInput => {}
            other => panic!("expected EndOfInput, got {other:?}"),
        }
    }

    #[test]
    fn completes_ambiguous_container_level_prefix() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec/net");
        fs.seed_dir("/libexec/netflow");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let shell = Shell::new(&fs, &spawner, config);
        let mut candidates = shell.complete_line("ne", None);
        candidates.sort();
        assert_eq!(candidates, vec!["net ", "netflow "]);
    }

    #[test]
    fn completes_unique_container_match_with_full_name() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec/net");
        fs.seed_dir("/sysconf/net");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let shell = Shell::new(&fs, &spawner, config);
        assert_eq!(shell.complete_line("ne", None), vec!["net "]);
    }

    #[test]
    fn completes_parameter_legal_keys_and_values_via_discovery() {
        struct DiscoverySpawner;
        impl ProcessSpawner for DiscoverySpawner {
            fn spawn(&self, _request: &SpawnRequest) -> Result<ExecResult, ShellError> {
                Ok(ExecResult { stdout: b"*name=\n-timeout=\nenabled\n".to_vec(), stderr: Vec::new(), exit_code: 0 })
            }
            fn spawn_inherited(&self, _request: &SpawnRequest) -> Result<i32, ShellError> {
                Ok(0)
            }
        }
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec");
        fs.seed_file("/libexec/show", b"#!/bin/sh\n");
        let spawner = DiscoverySpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let shell = Shell::new(&fs, &spawner, config);
        let mut candidates = shell.complete_line("show ", None);
        candidates.sort();
        assert_eq!(candidates, vec!["enabled", "name=", "timeout="]);
    }

    #[test]
    fn comp_point_truncates_the_line_before_tokenizing() {
        let fs = MemoryFs::new();
        fs.seed_dir("/libexec/net");
        fs.seed_dir("/sysconf/net");
        let spawner = FakeSpawner;
        let mut config = ShellConfig::default();
        config.libexec_root = "/libexec".to_string();
        config.sysconf_root = "/sysconf".to_string();
        let shell = Shell::new(&fs, &spawner, config);
        assert_eq!(shell.complete_line("net extra garbage", Some(3)), vec!["net "]);
    }
}
