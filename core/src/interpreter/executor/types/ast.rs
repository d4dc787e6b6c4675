//! Abstract Syntax Tree node types
//!
//! A parsed script lives in a single [`Ast`]: an index arena that owns the
//! source bytes and every node built from them. Nodes refer to each other by
//! [`NodeId`] and to source text by [`Span`], so a tree (and any evaluation
//! state pointing into it) can be cloned, shared, or serialized as a unit.

use serde::{Deserialize, Serialize};

use super::values::Value;

/// Index of a node inside its [`Ast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Byte range into the tree's source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// AST node
///
/// A `Word` always has at least two parts, or one part that is not a
/// `Literal`: the builder collapses the trivial cases into a bare `Literal`
/// and the evaluator relies on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Node {
    Script {
        commands: Vec<NodeId>,
    },
    Command {
        words: Vec<NodeId>,
        span: Span,
        line: u32,
    },
    Word {
        parts: Vec<NodeId>,
    },
    Literal {
        span: Span,
    },
    VarSimple {
        name: Span,
    },
    VarArray {
        name: Span,
        index: Option<NodeId>,
    },
    CmdSubst {
        script: NodeId,
    },
    Backslash {
        bytes: Vec<u8>,
    },
    Expand {
        word: NodeId,
    },
}

/// Arena holding one parsed tree and its source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    source: Vec<u8>,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    pub(crate) fn with_source(source: &[u8]) -> Self {
        Ast {
            source: source.to_vec(),
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Build a one-command script straight from already-constructed values.
    ///
    /// Each value becomes a `Literal` word verbatim, so no quoting or
    /// substitution is ever applied to the arguments.
    pub fn from_words(words: &[Value]) -> Self {
        let mut ast = Ast::with_source(&[]);
        let mut ids = Vec::with_capacity(words.len());
        for word in words {
            let start = ast.source.len();
            ast.source.extend_from_slice(word.as_bytes());
            ids.push(ast.alloc(Node::Literal {
                span: Span::new(start, ast.source.len()),
            }));
        }
        let end = ast.source.len();
        let command = ast.alloc(Node::Command {
            words: ids,
            span: Span::new(0, end),
            line: 1,
        });
        ast.root = ast.alloc(Node::Script {
            commands: vec![command],
        });
        ast
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn slice(&self, span: Span) -> &[u8] {
        &self.source[span.start as usize..span.end as usize]
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
