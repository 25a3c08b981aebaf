//! Search-anywhere key lookup over a [`JsonNode`] tree.
//!
//! Lookups are answered from a single deterministic walk over every mapping
//! reachable from the root. The walk is stratified by value type:
//!
//! - A mapping is yielded first, then its sequence-valued children are walked
//!   (in key order), then its mapping-valued children (in key order).
//! - A sequence yields nothing itself; its mapping items are walked first,
//!   then its sequence items.
//! - Scalars yield nothing.
//!
//! So within one container every nested list is fully explored before any
//! nested dict at the same level. [`first`] depends on this order, and the
//! same key under different parents is not disambiguated: the first mapping
//! in walk order that has the key wins.

use super::JsonNode;

/// Lazy pre-order walk over the mappings of a tree.
///
/// Uses an explicit stack, so arbitrarily deep documents cannot overflow
/// the call stack.
pub struct Nodes<'a> {
    stack: Vec<&'a JsonNode>,
}

impl<'a> Nodes<'a> {
    pub fn new(root: &'a JsonNode) -> Self {
        Self { stack: vec![root] }
    }

    /// Push two passes of children so that `first_pass` is popped first,
    /// each pass keeping its own order.
    fn push_passes(
        &mut self,
        first_pass: impl Iterator<Item = &'a JsonNode>,
        second_pass: impl Iterator<Item = &'a JsonNode>,
    ) {
        let start = self.stack.len();
        self.stack.extend(first_pass);
        self.stack.extend(second_pass);
        self.stack[start..].reverse();
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a JsonNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                JsonNode::Map(entries) => {
                    let values = move || entries.iter().map(|(_, v)| v);
                    self.push_passes(
                        values().filter(|v| v.is_seq()),
                        values().filter(|v| v.is_map()),
                    );
                    return Some(node);
                }
                JsonNode::Seq(items) => {
                    self.push_passes(
                        items.iter().filter(|v| v.is_map()),
                        items.iter().filter(|v| v.is_seq()),
                    );
                }
                JsonNode::Scalar(_) => {}
            }
        }
        None
    }
}

/// Every mapping reachable from `root`, in walk order.
pub fn enumerate_nodes(root: &JsonNode) -> Vec<&JsonNode> {
    Nodes::new(root).collect()
}

/// Value of `key` in the first mapping (walk order) that has it.
///
/// A miss is not an error here; callers decide whether it is fatal.
pub fn first<'a>(root: &'a JsonNode, key: &str) -> Option<&'a JsonNode> {
    Nodes::new(root).find_map(|node| node.get(key))
}

/// Values of `key` across every mapping that has it, in walk order.
pub fn all<'a>(root: &'a JsonNode, key: &str) -> Vec<&'a JsonNode> {
    Nodes::new(root).filter_map(|node| node.get(key)).collect()
}
