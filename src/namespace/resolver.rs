//! `parse_step`: resolve one argv element against a parent parse node.

use crate::config::ShellConfig;
use crate::discovery::{self, AncestorPair};
use crate::error::{AboveRootError, NotFoundError, ShellError};
use crate::fs::FileSystem;
use crate::namespace::{Ambiguous, Builtin, Command, CommandOption, Container, NodeArena, NodeId, ParseNode, Parameter};
use crate::process::ProcessSpawner;

pub type ResolveError = ShellError;

/// Names matched against a token: exact match wins outright; otherwise a
/// unique prefix match wins; two or more prefix matches make the result
/// ambiguous.
enum Match<'a> {
    None,
    Exact(&'a str, Category),
    Unique(&'a str, Category),
    Ambiguous(Vec<(&'a str, Category)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Builtin,
    Command,
    Container,
}

fn match_names<'a>(
    token: &str,
    builtins: &'a [String],
    commands: &'a [String],
    containers: &'a [String],
) -> Match<'a> {
    for (names, cat) in [(builtins, Category::Builtin), (commands, Category::Command), (containers, Category::Container)] {
        if let Some(name) = names.iter().find(|n| n.as_str() == token) {
            return Match::Exact(name, cat);
        }
    }
    let mut prefix_matches = Vec::new();
    for (names, cat) in [(builtins, Category::Builtin), (commands, Category::Command), (containers, Category::Container)] {
        for name in names {
            if name.starts_with(token) {
                prefix_matches.push((name.as_str(), cat));
            }
        }
    }
    match prefix_matches.len() {
        0 => Match::None,
        1 => {
            let (n, c) = prefix_matches[0];
            Match::Unique(n, c)
        }
        _ => Match::Ambiguous(prefix_matches),
    }
}

fn longest_common_remainder(prefix: &str, candidates: &[&str]) -> String {
    let remainders: Vec<&str> = candidates.iter().map(|c| &c[prefix.len()..]).collect();
    if remainders.is_empty() {
        return String::new();
    }
    let mut common = remainders[0];
    for r in &remainders[1..] {
        let mut end = 0;
        for (a, b) in common.bytes().zip(r.bytes()) {
            if a != b {
                break;
            }
            end += 1;
        }
        common = &common[..end];
    }
    common.to_string()
}

fn list_container(fs: &dyn FileSystem, libexec_path: &str, pathext: &[String]) -> Result<(Vec<String>, Vec<String>), ShellError> {
    let mut containers = Vec::new();
    let mut commands = Vec::new();
    for entry in fs.read_dir(libexec_path)? {
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

/// Resolve `token` against `parent`, allocating any new node into `arena`.
/// `completion_mode` controls whether resolving onto a `Command` triggers
/// the discovery sub-protocol (spec §4.2: discovery only runs when
/// completion is requested).
#[allow(clippy::too_many_arguments)]
pub fn parse_step(
    arena: &mut NodeArena,
    fs: &dyn FileSystem,
    spawner: &dyn ProcessSpawner,
    config: &ShellConfig,
    token: &str,
    parent: NodeId,
    completion_mode: bool,
) -> Result<NodeId, ResolveError> {
    let parent_node = arena.get(parent).node.clone();
    match parent_node {
        ParseNode::Container(container) => resolve_in_container(arena, fs, &container, parent, token, config),
        ParseNode::Command(_) => {
            resolve_parameter(arena, fs, spawner, config, parent, None, token, completion_mode)
        }
        ParseNode::Parameter(param) => {
            let command_ref = param.command_ref;
            resolve_parameter(arena, fs, spawner, config, command_ref, Some(parent), token, completion_mode)
        }
        ParseNode::Builtin(_) | ParseNode::Option(_) => {
            let id = arena.alloc(ParseNode::Option(CommandOption { command_ref: parent }), token, Some(parent));
            Ok(id)
        }
        ParseNode::Ambiguous(_) => Err(ShellError::from(NotFoundError { token: token.to_string() })),
    }
}

fn resolve_in_container(
    arena: &mut NodeArena,
    fs: &dyn FileSystem,
    container: &Container,
    parent: NodeId,
    token: &str,
    config: &ShellConfig,
) -> Result<NodeId, ResolveError> {
    if token == ".." {
        return match arena.get(parent).parent {
            Some(grandparent) => Ok(grandparent),
            None => Err(ShellError::from(AboveRootError)),
        };
    }

    match match_names(token, &container.builtins, &container.child_commands, &container.child_containers) {
        Match::None => Err(ShellError::from(NotFoundError { token: token.to_string() })),
        Match::Exact(name, cat) | Match::Unique(name, cat) => {
            build_matched_node(arena, fs, container, parent, name, cat, config)
        }
        Match::Ambiguous(matches) => {
            let mut amb = Ambiguous { prefix: token.to_string(), ..Default::default() };
            for (name, cat) in &matches {
                match cat {
                    Category::Builtin => amb.builtins.push(name.to_string()),
                    Category::Command => amb.commands.push(name.to_string()),
                    Category::Container => amb.containers.push(name.to_string()),
                }
            }
            let names: Vec<&str> = matches.iter().map(|(n, _)| *n).collect();
            amb.longest_common_remainder = longest_common_remainder(token, &names);
            let id = arena.alloc(ParseNode::Ambiguous(amb), token, Some(parent));
            Ok(id)
        }
    }
}

fn build_matched_node(
    arena: &mut NodeArena,
    fs: &dyn FileSystem,
    container: &Container,
    parent: NodeId,
    name: &str,
    cat: Category,
    config: &ShellConfig,
) -> Result<NodeId, ResolveError> {
    match cat {
        Category::Builtin => Ok(arena.alloc(ParseNode::Builtin(Builtin::default()), name, Some(parent))),
        Category::Command => {
            let libexec_path = fs.join_rooted(&container.libexec_path, name)?;
            let sysconf_path = fs.join_rooted(&container.sysconf_path, name)?;
            Ok(arena.alloc(ParseNode::Command(Command { libexec_path, sysconf_path }), name, Some(parent)))
        }
        Category::Container => {
            let libexec_path = fs.join_rooted(&container.libexec_path, name)?;
            let sysconf_path = fs.join_rooted(&container.sysconf_path, name)?;
            let (child_containers, child_commands) = list_container(fs, &libexec_path, &config.pathext)?;
            let new_container = Container {
                libexec_path,
                sysconf_path,
                child_containers,
                child_commands,
                builtins: Vec::new(),
            };
            Ok(arena.alloc(ParseNode::Container(new_container), name, Some(parent)))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_parameter(
    arena: &mut NodeArena,
    fs: &dyn FileSystem,
    spawner: &dyn ProcessSpawner,
    config: &ShellConfig,
    command_ref: NodeId,
    param_parent: Option<NodeId>,
    token: &str,
    completion_mode: bool,
) -> Result<NodeId, ResolveError> {
    let _ = fs;
    let command = match &arena.get(command_ref).node {
        ParseNode::Command(c) => c.clone(),
        other => panic!("resolve_parameter called with non-command command_ref: {other:?}"),
    };

    let mut param = Parameter {
        command_ref,
        key: None,
        value: String::new(),
        legal_keys: Vec::new(),
        required_keys: Vec::new(),
        legal_values: Vec::new(),
        error: None,
        stderr_bytes: None,
        required: false,
    };

    if completion_mode {
        let ancestors = collect_ancestor_pairs(arena, param_parent);
        let result = discovery::run_discovery(
            spawner,
            &command.libexec_path,
            &command.sysconf_path,
            &ancestors,
            token,
            config.child_env(),
            config.discovery_line_cap,
        );
        param.legal_keys = result.legal_keys;
        param.required_keys = result.required_keys;
        param.legal_values = result.legal_values;
        param.error = result.error;
        param.stderr_bytes = Some(result.stderr_bytes);
        if let Some((partial, candidates)) = apply_second_stage_match(&mut param, token) {
            let candidate_refs: Vec<&str> = candidates.iter().map(|s| s.as_str()).collect();
            let remainder = longest_common_remainder(&partial, &candidate_refs);
            let amb = Ambiguous {
                prefix: partial,
                longest_common_remainder: remainder,
                values: candidates,
                ..Default::default()
            };
            let parent = param_parent.unwrap_or(command_ref);
            return Ok(arena.alloc(ParseNode::Ambiguous(amb), token, Some(parent)));
        }
    } else if let Some((key, value)) = token.split_once('=') {
        param.key = Some(key.to_string());
        param.value = value.to_string();
    } else {
        param.value = token.to_string();
    }

    let parent = param_parent.unwrap_or(command_ref);
    Ok(arena.alloc(ParseNode::Parameter(param), token, Some(parent)))
}

fn collect_ancestor_pairs(arena: &NodeArena, param_parent: Option<NodeId>) -> Vec<AncestorPair> {
    let mut pairs = Vec::new();
    let mut cur = param_parent;
    let mut chain = Vec::new();
    while let Some(id) = cur {
        if let ParseNode::Parameter(p) = &arena.get(id).node {
            chain.push(p.clone());
            cur = arena.get(id).parent;
        } else {
            break;
        }
    }
    chain.reverse();
    for p in chain {
        pairs.push(AncestorPair { key: p.key.clone().unwrap_or_default(), value: p.value.clone() });
    }
    pairs
}

/// Second-stage match (spec §4.2): once discovery has produced legal
/// keys/required keys/legal values, re-match the raw token against them.
/// Returns `Some((partial_value, candidates))` when the `key=value` branch
/// finds more than one legal value sharing the typed prefix — the spec
/// requires this case to surface as an `Ambiguous` node carrying only
/// `values`, so the caller allocates that node instead of a `Parameter`.
fn apply_second_stage_match(param: &mut Parameter, token: &str) -> Option<(String, Vec<String>)> {
    if let Some((key, value)) = token.split_once('=') {
        param.key = Some(key.to_string());
        match match_value(value, &param.legal_values) {
            Match1::Exact(v) | Match1::Unique(v) => {
                param.value = v;
                None
            }
            Match1::Ambiguous(candidates) => {
                param.value = value.to_string();
                Some((value.to_string(), candidates))
            }
            Match1::None => {
                param.value = value.to_string();
                None
            }
        }
    } else {
        apply_second_stage_bare_token(param, token);
        None
    }
}

fn apply_second_stage_bare_token(param: &mut Parameter, token: &str) {
    let mut combined: Vec<(&str, Source)> = Vec::new();
    for k in &param.required_keys {
        combined.push((k.as_str(), Source::RequiredKey));
    }
    for k in &param.legal_keys {
        combined.push((k.as_str(), Source::LegalKey));
    }
    for v in &param.legal_values {
        combined.push((v.as_str(), Source::Value));
    }

    if let Some((name, source)) = combined.iter().find(|(n, _)| *n == token) {
        apply_source(param, name, *source);
        return;
    }
    let prefix_matches: Vec<&(&str, Source)> = combined.iter().filter(|(n, _)| n.starts_with(token)).collect();
    if prefix_matches.len() == 1 {
        let (name, source) = prefix_matches[0];
        apply_source(param, name, *source);
    } else {
        param.value = token.to_string();
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    RequiredKey,
    LegalKey,
    Value,
}

fn apply_source(param: &mut Parameter, name: &str, source: Source) {
    match source {
        Source::RequiredKey => {
            param.key = Some(name.to_string());
            param.value = String::new();
            param.required = true;
        }
        Source::LegalKey => {
            param.key = Some(name.to_string());
            param.value = String::new();
        }
        Source::Value => {
            param.value = name.to_string();
        }
    }
}

enum Match1 {
    None,
    Exact(String),
    Unique(String),
    Ambiguous(Vec<String>),
}

fn match_value(token: &str, candidates: &[String]) -> Match1 {
    if let Some(c) = candidates.iter().find(|c| c.as_str() == token) {
        return Match1::Exact(c.clone());
    }
    let matches: Vec<&String> = candidates.iter().filter(|c| c.starts_with(token)).collect();
    match matches.len() {
        0 => Match1::None,
        1 => Match1::Unique(matches[0].clone()),
        _ => Match1::Ambiguous(matches.into_iter().cloned().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::process::{ExecResult, SpawnRequest};

    struct NullSpawner;
    impl ProcessSpawner for NullSpawner {
        fn spawn(&self, _request: &SpawnRequest) -> Result<ExecResult, ShellError> {
            Ok(ExecResult::default())
        }
        fn spawn_inherited(&self, _request: &SpawnRequest) -> Result<i32, ShellError> {
            Ok(0)
        }
    }

    fn root_container() -> Container {
        Container {
            libexec_path: "/libexec".to_string(),
            sysconf_path: "/sysconf".to_string(),
            child_containers: Vec::new(),
            child_commands: vec!["show".to_string(), "shutdown".to_string()],
            builtins: vec!["exit".to_string(), "quit".to_string()],
        }
    }

    #[test]
    fn scenario_4_ambiguous_prefix_with_remainder() {
        let fs = MemoryFs::new();
        let spawner = NullSpawner;
        let config = ShellConfig::default();
        let mut arena = NodeArena::new();
        let root = arena.alloc(ParseNode::Container(root_container()), "/", None);
        let result = parse_step(&mut arena, &fs, &spawner, &config, "s", root, false).unwrap();
        match &arena.get(result).node {
            ParseNode::Ambiguous(amb) => {
                assert_eq!(amb.prefix, "s");
                let mut commands = amb.commands.clone();
                commands.sort();
                assert_eq!(commands, vec!["show", "shutdown"]);
                assert_eq!(amb.longest_common_remainder, "h");
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn exact_match_never_ambiguous_even_with_prefix_collision() {
        let fs = MemoryFs::new();
        let spawner = NullSpawner;
        let config = ShellConfig::default();
        let mut arena = NodeArena::new();
        let mut container = root_container();
        container.child_commands.push("sh".to_string());
        let root = arena.alloc(ParseNode::Container(container), "/", None);
        let result = parse_step(&mut arena, &fs, &spawner, &config, "sh", root, false).unwrap();
        assert!(matches!(&arena.get(result).node, ParseNode::Command(_)));
    }

    #[test]
    fn dotdot_ascends_and_errors_at_root() {
        let fs = MemoryFs::new();
        let spawner = NullSpawner;
        let config = ShellConfig::default();
        let mut arena = NodeArena::new();
        let root = arena.alloc(ParseNode::Container(root_container()), "/", None);
        let err = parse_step(&mut arena, &fs, &spawner, &config, "..", root, false).unwrap_err();
        assert!(matches!(err, ShellError::AboveRoot(_)));
    }

    #[test]
    fn unquoted_key_value_splits_without_discovery() {
        let fs = MemoryFs::new();
        let spawner = NullSpawner;
        let config = ShellConfig::default();
        let mut arena = NodeArena::new();
        let root = arena.alloc(ParseNode::Container(root_container()), "/", None);
        let cmd = parse_step(&mut arena, &fs, &spawner, &config, "show", root, false).unwrap();
        let param = parse_step(&mut arena, &fs, &spawner, &config, "port=22", cmd, false).unwrap();
        match &arena.get(param).node {
            ParseNode::Parameter(p) => {
                assert_eq!(p.key.as_deref(), Some("port"));
                assert_eq!(p.value, "22");
            }
            other => panic!("expected Parameter, got {other:?}"),
        }
    }

    struct DiscoverySpawner {
        stdout: &'static [u8],
    }
    impl ProcessSpawner for DiscoverySpawner {
        fn spawn(&self, _request: &SpawnRequest) -> Result<ExecResult, ShellError> {
            Ok(ExecResult { stdout: self.stdout.to_vec(), stderr: Vec::new(), exit_code: 0 })
        }
        fn spawn_inherited(&self, _request: &SpawnRequest) -> Result<i32, ShellError> {
            Ok(0)
        }
    }

    #[test]
    fn key_value_ambiguous_legal_values_produce_ambiguous_node() {
        let fs = MemoryFs::new();
        let spawner = DiscoverySpawner { stdout: b"-enabled\n-enableall\n" };
        let config = ShellConfig::default();
        let mut arena = NodeArena::new();
        let root = arena.alloc(ParseNode::Container(root_container()), "/", None);
        let cmd = parse_step(&mut arena, &fs, &spawner, &config, "show", root, false).unwrap();
        let param = parse_step(&mut arena, &fs, &spawner, &config, "mode=en", cmd, true).unwrap();
        match &arena.get(param).node {
            ParseNode::Ambiguous(amb) => {
                assert_eq!(amb.prefix, "en");
                let mut values = amb.values.clone();
                values.sort();
                assert_eq!(values, vec!["enableall", "enabled"]);
                assert_eq!(amb.longest_common_remainder, "able");
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }
}
