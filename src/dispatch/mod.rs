//! The dispatcher: given a resolved terminal parse-tree node, either
//! navigate (containers), spawn a child (commands/parameters), resolve a
//! builtin, or report ambiguity.

use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::namespace::{NodeArena, NodeId, ParseNode};
use crate::process::{ProcessSpawner, SpawnRequest};

/// Outcome of dispatching one resolved node.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Navigated into a container; caller should replace its saved path
    /// with the returned chain (root-first).
    Navigated(Vec<NodeId>),
    /// A command/parameter chain was spawned; carries its exit code.
    Executed { exit_code: i32 },
    /// `exit`/`quit` was resolved; the interactive loop should stop.
    EndOfInput,
    /// The terminal node was `Ambiguous`.
    Ambiguous { message: String },
}

pub fn dispatch(
    arena: &NodeArena,
    spawner: &dyn ProcessSpawner,
    config: &ShellConfig,
    terminal: NodeId,
    line: usize,
    column: usize,
) -> Result<DispatchOutcome, ShellError> {
    match &arena.get(terminal).node {
        ParseNode::Container(_) => Ok(DispatchOutcome::Navigated(arena.chain_from_root(terminal))),
        ParseNode::Command(_) | ParseNode::Parameter(_) => execute_command_chain(arena, spawner, config, terminal),
        ParseNode::Builtin(_) | ParseNode::Option(_) => {
            let builtin_id = arena.owning_builtin(terminal).expect("Builtin/Option chain must own a Builtin");
            let name = &arena.get(builtin_id).name;
            if name == "exit" || name == "quit" {
                Ok(DispatchOutcome::EndOfInput)
            } else {
                Ok(DispatchOutcome::Ambiguous { message: format!("unknown builtin '{name}'") })
            }
        }
        ParseNode::Ambiguous(_) => {
            let name = &arena.get(terminal).name;
            Ok(DispatchOutcome::Ambiguous {
                message: format!("bad command '{name}' (line {line} column {column})"),
            })
        }
    }
}

fn execute_command_chain(
    arena: &NodeArena,
    spawner: &dyn ProcessSpawner,
    config: &ShellConfig,
    terminal: NodeId,
) -> Result<DispatchOutcome, ShellError> {
    let command_id = arena.owning_command(terminal).expect("Command/Parameter chain must own a Command");
    let command = match &arena.get(command_id).node {
        ParseNode::Command(c) => c.clone(),
        _ => unreachable!(),
    };

    let mut args = vec!["--".to_string()];
    let mut chain = Vec::new();
    let mut cur = Some(terminal);
    while let Some(id) = cur {
        if id == command_id {
            break;
        }
        if let ParseNode::Parameter(p) = &arena.get(id).node {
            chain.push(p.clone());
        }
        cur = arena.get(id).parent;
    }
    chain.reverse();
    for p in chain {
        if let Some(key) = &p.key {
            args.push(key.clone());
        } else {
            args.push(String::new());
        }
        args.push(p.value.clone());
    }

    let request = SpawnRequest {
        program: command.libexec_path.clone(),
        args,
        cwd: Some(command.sysconf_path.clone()),
        env: config.child_env(),
        stdin: None,
    };

    let exit_code = spawner.spawn_inherited(&request)?;
    Ok(DispatchOutcome::Executed { exit_code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{Command, Container};
    use crate::process::ExecResult;

    struct FakeSpawner {
        inherited_exit: i32,
    }
    impl ProcessSpawner for FakeSpawner {
        fn spawn(&self, _request: &SpawnRequest) -> Result<ExecResult, ShellError> {
            Ok(ExecResult::default())
        }
        fn spawn_inherited(&self, _request: &SpawnRequest) -> Result<i32, ShellError> {
            Ok(self.inherited_exit)
        }
    }

    #[test]
    fn container_dispatch_returns_navigation_chain() {
        let mut arena = NodeArena::new();
        let root = arena.alloc(
            ParseNode::Container(Container {
                libexec_path: "/libexec".to_string(),
                sysconf_path: "/sysconf".to_string(),
                child_containers: Vec::new(),
                child_commands: Vec::new(),
                builtins: Vec::new(),
            }),
            "/",
            None,
        );
        let spawner = FakeSpawner { inherited_exit: 0 };
        let config = ShellConfig::default();
        let outcome = dispatch(&arena, &spawner, &config, root, 1, 0).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Navigated(chain) if chain == vec![root]));
    }

    #[test]
    fn command_dispatch_executes_and_returns_exit_code() {
        let mut arena = NodeArena::new();
        let cmd = arena.alloc(
            ParseNode::Command(Command { libexec_path: "/libexec/show".to_string(), sysconf_path: "/sysconf/show".to_string() }),
            "show",
            None,
        );
        let spawner = FakeSpawner { inherited_exit: 7 };
        let config = ShellConfig::default();
        let outcome = dispatch(&arena, &spawner, &config, cmd, 1, 0).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Executed { exit_code: 7 }));
    }
}
