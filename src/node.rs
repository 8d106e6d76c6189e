use crate::reference::Ref;

/// An internal BDD node: `variable ? high : low`.
///
/// The terminal node is stored with `variable == 0`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub variable: u32,
    pub low: Ref,
    pub high: Ref,
}

impl Node {
    pub const TERMINAL: Node = Node {
        variable: 0,
        low: Ref::ONE,
        high: Ref::ONE,
    };

    pub fn is_terminal(&self) -> bool {
        self.variable == 0
    }
}
