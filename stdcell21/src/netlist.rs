//!
//! # Netlist & Stack Input Model
//!
//! The synthesizer consumes transistor netlists already decomposed into
//! series stacks by an upstream pass. Everything here is read-only input:
//! plain indexed vectors, never mutated during synthesis.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::Int;
use crate::utils::Ptr;
pub use tiles21::{FetType, NetId};

/// Index of a [Node] within its [Netlist]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);
impl NodeId {
    /// The tile-plane net reference for this node
    pub fn net(self) -> NetId {
        NetId(self.0)
    }
}

/// Index of a [FetEdge] within its [Netlist]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeId(pub usize);

/// # Circuit Node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    /// Node Name
    pub name: String,
    /// Whether this node carries a contact where a stack touches it
    pub contact: bool,
}

/// # Cell Port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Port {
    /// The node this port exposes
    pub node: NodeId,
    /// Direction: true for inputs
    pub input: bool,
    /// Omitted ports get no pin geometry and no LEF PIN block
    #[serde(default)]
    pub omit: bool,
}

/// # Transistor Edge
///
/// One field-effect transistor: polarity, process flavor, electrical
/// width and gate length, and its three terminals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetEdge {
    pub ftype: FetType,
    pub flavor: u8,
    /// Electrical width
    pub w: Int,
    /// Gate length
    pub l: Int,
    /// Gate node
    pub gate: NodeId,
    /// One diffusion terminal
    pub a: NodeId,
    /// The other diffusion terminal
    pub b: NodeId,
}
impl FetEdge {
    /// The terminal opposite `n`. Panics if `n` is neither terminal,
    /// which indicates a malformed stack - an upstream contract breach.
    pub fn other(&self, n: NodeId) -> NodeId {
        if self.a == n {
            self.b
        } else {
            assert!(self.b == n, "node is not a terminal of this edge");
            self.a
        }
    }
}

/// # Netlist
///
/// One cell's transistors, nodes, supplies, and ports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Netlist {
    /// Cell Name
    pub name: String,
    /// Circuit nodes
    pub nodes: Vec<Node>,
    /// Transistor edges
    pub edges: Vec<FetEdge>,
    /// Power supply node
    pub vdd: NodeId,
    /// Ground node
    pub gnd: NodeId,
    /// Exposed ports, in declaration order
    pub ports: Vec<Port>,
}
impl Netlist {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
    pub fn edge(&self, id: EdgeId) -> &FetEdge {
        &self.edges[id.0]
    }
    /// Find a node by name
    pub fn node_named(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(NodeId)
    }
}

/// Reference to one fold-segment of one edge, as a stack element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairEdge {
    pub edge: EdgeId,
    /// Fold-segment index within the edge
    pub idx: usize,
}

/// One step of a [SeriesStack]: an edge traversed to its `right` node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackElem {
    pub edge: EdgeId,
    pub idx: usize,
    /// The node reached after crossing `edge`
    pub right: NodeId,
}

/// # Series Stack
///
/// A chain of series-connected same-polarity transistors sharing
/// diffusion nodes, laid out as one diffusion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesStack {
    /// Leftmost node of the chain
    pub left: NodeId,
    pub elems: Vec<StackElem>,
}

/// One gate column of a [DualStack]: an n-edge and/or a p-edge
/// sharing the column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatePair {
    pub n: Option<PairEdge>,
    pub p: Option<PairEdge>,
}

/// # Dual Stack
///
/// Paired n-row and p-row chains synthesized in lockstep so that shared
/// gate columns land at identical x-coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DualStack {
    /// Leftmost node of the n-row
    pub nleft: NodeId,
    /// Leftmost node of the p-row
    pub pleft: NodeId,
    pub pairs: Vec<GatePair>,
}

/// # Per-Cell Stack Decomposition
///
/// The upstream decomposition pass's output for one cell:
/// dual stacks first, then leftover single-polarity chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellStacks {
    pub dual: Vec<DualStack>,
    pub nstacks: Vec<SeriesStack>,
    pub pstacks: Vec<SeriesStack>,
}
impl CellStacks {
    pub fn is_empty(&self) -> bool {
        self.dual.is_empty() && self.nstacks.is_empty() && self.pstacks.is_empty()
    }
}

/// # Process Hierarchy Node
///
/// One process (cell) definition: its own stacks and netlist, plus the
/// sub-processes it instantiates. The synthesis pass walks these bottom-up
/// and memoizes one composite per [Ptr]-identity.
#[derive(Debug, Default)]
pub struct Process {
    /// Process Name
    pub name: String,
    /// Instantiated sub-processes
    pub instances: Vec<Ptr<Process>>,
    /// This process's own netlist, if it has local circuitry
    pub netlist: Option<Ptr<Netlist>>,
    /// This process's stack decomposition
    pub stacks: Option<CellStacks>,
}
impl Process {
    /// Create a new leaf [Process] with local circuitry
    pub fn new(
        name: impl Into<String>,
        netlist: Ptr<Netlist>,
        stacks: CellStacks,
    ) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
            netlist: Some(netlist),
            stacks: Some(stacks),
        }
    }
}
