/// Index of a [`Node`] inside its [`Ast`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One entry of a child sequence: raw template text or a directive node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Text(String),
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `{% for variable in source %} body {% end %}`
    For {
        variable: String,
        source: String,
        body: Vec<Child>,
    },
    /// An `if` that has not seen an `else` or `elif`.
    If { condition: String, body: Vec<Child> },
    /// An `if` promoted in place once its `else` or `elif` was reached.
    IfElse {
        condition: String,
        then_branch: Vec<Child>,
        else_branch: Vec<Child>,
    },
    /// A bare `{% expression %}` substitution.
    Expression { expression: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    /// The enclosing block, or `None` for nodes in the root sequence.
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// A processed template: an arena of nodes plus the root child sequence.
///
/// Nodes are addressed by [`NodeId`]; a parent refers to its children by id,
/// so replacing a node is an overwrite of its arena slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Vec<Child>,
}

impl Ast {
    pub fn root(&self) -> &[Child] {
        &self.root
    }

    /// # Panics
    /// If `id` was not produced by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.root.is_empty()
    }

    pub(crate) fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, kind });
        id
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub(crate) fn root_mut(&mut self) -> &mut Vec<Child> {
        &mut self.root
    }

    /// Stores the children collected for a block once it is closed: the
    /// body of a `For` or `If`, the else-branch of an `IfElse`.
    /// Expression nodes own no children, so nothing is stored for them.
    pub(crate) fn close(&mut self, id: NodeId, children: Vec<Child>) {
        match &mut self.nodes[id.0].kind {
            NodeKind::For { body, .. } | NodeKind::If { body, .. } => *body = children,
            NodeKind::IfElse { else_branch, .. } => *else_branch = children,
            NodeKind::Expression { .. } => {}
        }
    }
}
