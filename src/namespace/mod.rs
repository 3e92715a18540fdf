//! The typed parse tree: containers, commands, parameters, builtins,
//! options, and the ambiguous-match node, all owned by an index-based
//! arena so parent back-references never need `Rc`/`RefCell`.

pub mod resolver;

use crate::namespace::resolver::ResolveError;

/// Index into a [`NodeArena`]. Never dereferenced without the arena that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct Container {
    pub libexec_path: String,
    pub sysconf_path: String,
    pub child_containers: Vec<String>,
    pub child_commands: Vec<String>,
    pub builtins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub libexec_path: String,
    pub sysconf_path: String,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub command_ref: NodeId,
    pub key: Option<String>,
    pub value: String,
    pub legal_keys: Vec<String>,
    pub required_keys: Vec<String>,
    pub legal_values: Vec<String>,
    pub error: Option<String>,
    pub stderr_bytes: Option<Vec<u8>>,
    pub required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Builtin {}

#[derive(Debug, Clone)]
pub struct CommandOption {
    pub command_ref: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct Ambiguous {
    pub prefix: String,
    pub longest_common_remainder: String,
    pub containers: Vec<String>,
    pub commands: Vec<String>,
    pub builtins: Vec<String>,
    pub keys: Vec<String>,
    pub requires: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ParseNode {
    Container(Container),
    Command(Command),
    Parameter(Parameter),
    Builtin(Builtin),
    Option(CommandOption),
    Ambiguous(Ambiguous),
}

impl ParseNode {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ParseNode::Ambiguous(_))
    }

    /// Default completion tail is a trailing space; a `Parameter` awaiting
    /// its value after a bare key match uses `"="` instead.
    pub fn completion_tail(&self) -> &'static str {
        match self {
            ParseNode::Parameter(p) if p.key.is_some() && p.value.is_empty() => "=",
            _ => " ",
        }
    }
}

/// One arena slot: the node payload, its display name, optional source
/// offsets, and a parent back-reference (never owning).
#[derive(Debug, Clone)]
pub struct NodeSlot {
    pub node: ParseNode,
    pub name: String,
    pub parent: Option<NodeId>,
    pub offsets: Option<(usize, usize)>,
}

/// Owns every node produced while resolving one line of input. Dropped
/// (and everything in it freed) when the resolver call returns — per-call
/// arena lifetime, matching the single-threaded cooperative resource model.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<NodeSlot>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena { slots: Vec::new() }
    }

    pub fn alloc(&mut self, node: ParseNode, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(NodeSlot { node, name: name.into(), parent, offsets: None });
        id
    }

    pub fn get(&self, id: NodeId) -> &NodeSlot {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeSlot {
        &mut self.slots[id.0]
    }

    pub fn set_offsets(&mut self, id: NodeId, start: usize, end: usize) {
        self.slots[id.0].offsets = Some((start, end));
    }

    /// Walk from `id` up through `parent` links to the root, returning the
    /// chain root-first.
    pub fn chain_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            chain.push(c);
            cur = self.slots[c.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Find the nearest ancestor (inclusive) that is a `Command`/`Parameter`
    /// chain's owning command, by walking parent links until a
    /// `ParseNode::Command` is found.
    pub fn owning_command(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if matches!(self.slots[c.0].node, ParseNode::Command(_)) {
                return Some(c);
            }
            cur = self.slots[c.0].parent;
        }
        None
    }

    /// Find the nearest ancestor (inclusive) that is a `Builtin`.
    pub fn owning_builtin(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if matches!(self.slots[c.0].node, ParseNode::Builtin(_)) {
                return Some(c);
            }
            cur = self.slots[c.0].parent;
        }
        None
    }
}

pub use resolver::parse_step;

pub type ParseResult = Result<NodeId, ResolveError>;
