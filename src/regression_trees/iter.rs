use std::iter::Iterator;

use super::algorithm::NodeKind;
use super::TreeNode;
use linfa::Float;

/// Depth-first iterator over the nodes reachable from the root of a fitted
/// regression tree. Records orphaned by pruning are skipped.
pub struct NodeIter<'a, F> {
    nodes: &'a [TreeNode<F>],
    stack: Vec<usize>,
}

impl<'a, F> NodeIter<'a, F> {
    pub(crate) fn new(nodes: &'a [TreeNode<F>], stack: Vec<usize>) -> Self {
        NodeIter { nodes, stack }
    }
}

impl<'a, F: Float> Iterator for NodeIter<'a, F> {
    type Item = &'a TreeNode<F>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|id| {
            let node = &self.nodes[id];
            if let NodeKind::Split { left, right, .. } = node.kind {
                self.stack.push(left);
                self.stack.push(right);
            }
            node
        })
    }
}
