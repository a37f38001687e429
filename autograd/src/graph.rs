use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;
use ndarray::{Array2, ArrayView2, Axis};

use crate::{
    error::{GraphErr, Result},
    parameter::Parameter,
};

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

/// A handle to a value recorded in a `Graph`.
///
/// Handles are only meaningful for the graph that created them, passing them to another graph
/// fails with `GraphErr::UnknownNode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    pub(crate) graph: usize,
    pub(crate) index: usize,
}

/// The operation that produced a node, along with its operands.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Leaf,
    Linear(Node, Node),
    AddBias(Node, Node),
    Add(Node, Node),
    Relu(Node),
    DotProduct(Node, Node),
    SquareLoss(Node, Node),
    SoftmaxLoss(Node, Node),
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Leaf => "leaf",
            Op::Linear(..) => "linear",
            Op::AddBias(..) => "add_bias",
            Op::Add(..) => "add",
            Op::Relu(_) => "relu",
            Op::DotProduct(..) => "dot_product",
            Op::SquareLoss(..) => "square_loss",
            Op::SoftmaxLoss(..) => "softmax_loss",
        }
    }
}

pub(crate) struct Entry {
    pub(crate) op: Op,
    pub(crate) value: Array2<f32>,
}

/// A tape of array operations.
///
/// Every operation eagerly computes its value and records how it was obtained, so that
/// `Graph::gradients` can later walk the tape backwards. Nodes can only refer to nodes created
/// before them, which makes the creation order a valid topological order.
pub struct Graph {
    id: usize,
    pub(crate) nodes: Vec<Entry>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Records a leaf holding data that is not trained, like inputs or targets.
    pub fn constant(&mut self, value: Array2<f32>) -> Node {
        self.push(Op::Leaf, value)
    }

    /// Records a leaf holding a snapshot of the parameter's current value.
    pub fn param(&mut self, param: &Parameter) -> Node {
        self.push(Op::Leaf, param.data().to_owned())
    }

    /// Matrix product of `x` (`B x I`) and `w` (`I x O`), resulting in a `B x O` node.
    pub fn linear(&mut self, x: Node, w: Node) -> Result<Node> {
        let op = Op::Linear(x, w);
        let (x, w) = (self.get(x)?, self.get(w)?);
        check(op, x.ncols() == w.nrows(), x, w)?;

        let value = x.dot(w);
        Ok(self.push(op, value))
    }

    /// Adds the `1 x F` bias `b` to every row of `x` (`B x F`).
    pub fn add_bias(&mut self, x: Node, b: Node) -> Result<Node> {
        let op = Op::AddBias(x, b);
        let (x, b) = (self.get(x)?, self.get(b)?);
        check(op, b.nrows() == 1 && x.ncols() == b.ncols(), x, b)?;

        let value = x + b;
        Ok(self.push(op, value))
    }

    /// Elementwise sum of two nodes of the same shape.
    pub fn add(&mut self, a: Node, b: Node) -> Result<Node> {
        let op = Op::Add(a, b);
        let (a, b) = (self.get(a)?, self.get(b)?);
        check(op, a.dim() == b.dim(), a, b)?;

        let value = a + b;
        Ok(self.push(op, value))
    }

    /// Elementwise `max(0, a)`.
    pub fn relu(&mut self, a: Node) -> Result<Node> {
        let value = self.get(a)?.mapv(|v| v.max(0.));
        Ok(self.push(Op::Relu(a), value))
    }

    /// Scores every row of `x` (`B x D`) against the single row `w` (`1 x D`), resulting in a
    /// `B x 1` node.
    pub fn dot_product(&mut self, x: Node, w: Node) -> Result<Node> {
        let op = Op::DotProduct(x, w);
        let (x, w) = (self.get(x)?, self.get(w)?);
        check(op, w.nrows() == 1 && x.ncols() == w.ncols(), x, w)?;

        let value = x.dot(&w.t());
        Ok(self.push(op, value))
    }

    /// Mean of the halved squared differences between `a` and `b`, as a `1 x 1` node.
    pub fn square_loss(&mut self, a: Node, b: Node) -> Result<Node> {
        let op = Op::SquareLoss(a, b);
        let (a, b) = (self.get(a)?, self.get(b)?);
        check(op, a.dim() == b.dim(), a, b)?;

        let loss = (a - b).mapv(|d| d * d / 2.).mean().unwrap_or_default();
        Ok(self.push(op, Array2::from_elem((1, 1), loss)))
    }

    /// Cross entropy between `softmax(logits)` and `labels`, averaged over the rows, as a
    /// `1 x 1` node.
    ///
    /// # Returns
    /// `GraphErr::InvalidLabels` if a row of `labels` is not a probability distribution.
    pub fn softmax_loss(&mut self, logits: Node, labels: Node) -> Result<Node> {
        let op = Op::SoftmaxLoss(logits, labels);
        let (logits, labels) = (self.get(logits)?, self.get(labels)?);
        check(op, logits.dim() == labels.dim() && logits.nrows() > 0, logits, labels)?;

        for (row, label) in labels.rows().into_iter().enumerate() {
            let negative = label.iter().any(|&p| p < 0.);
            if negative || (label.sum() - 1.).abs() > 1e-4 {
                return Err(GraphErr::InvalidLabels { row });
            }
        }

        let log_probs = log_softmax(logits.view());
        let loss = -(&log_probs * labels).sum() / logits.nrows() as f32;
        Ok(self.push(op, Array2::from_elem((1, 1), loss)))
    }

    /// Gives a view of the value computed for `node`.
    pub fn value(&self, node: Node) -> Result<ArrayView2<'_, f32>> {
        self.get(node).map(|value| value.view())
    }

    /// Returns the single value of a `1 x 1` node.
    pub fn as_scalar(&self, node: Node) -> Result<f32> {
        let value = self.get(node)?;
        match value.dim() {
            (1, 1) => Ok(value[[0, 0]]),
            shape => Err(GraphErr::NotScalar { shape }),
        }
    }

    pub(crate) fn get(&self, node: Node) -> Result<&Array2<f32>> {
        self.entry(node).map(|entry| &entry.value)
    }

    pub(crate) fn entry(&self, node: Node) -> Result<&Entry> {
        let unknown = GraphErr::UnknownNode {
            node: node.index,
            len: self.nodes.len(),
        };

        if node.graph != self.id {
            return Err(unknown);
        }

        self.nodes.get(node.index).ok_or(unknown)
    }

    fn push(&mut self, op: Op, value: Array2<f32>) -> Node {
        let index = self.nodes.len();
        let (rows, cols) = value.dim();
        trace!(index = index, op = op.name(), rows = rows, cols = cols; "recorded node");

        self.nodes.push(Entry { op, value });
        Node {
            graph: self.id,
            index,
        }
    }
}

/// Fails with a `GraphErr::ShapeMismatch` for `op` unless `ok` holds.
fn check(op: Op, ok: bool, left: &Array2<f32>, right: &Array2<f32>) -> Result<()> {
    if ok {
        return Ok(());
    }

    Err(GraphErr::ShapeMismatch {
        op: op.name(),
        left: left.dim(),
        right: right.dim(),
    })
}

/// Row wise `log(softmax(x))`, shifting every row by its maximum first.
pub(crate) fn log_softmax(x: ArrayView2<f32>) -> Array2<f32> {
    let mut out = x.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum = row.mapv(|v| (v - max).exp()).sum().ln();
        row.mapv_inplace(|v| v - max - log_sum);
    }

    out
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn linear_multiplies_matrices() {
        let mut graph = Graph::new();
        let x = graph.constant(array![[1., 2.], [3., 4.]]);
        let w = graph.constant(array![[1., 0., 2.], [0., 1., -1.]]);

        let y = graph.linear(x, w).unwrap();
        assert_eq!(
            graph.value(y).unwrap(),
            array![[1f32, 2., 0.], [3., 4., 2.]]
        );
    }

    #[test]
    fn add_bias_broadcasts_a_single_row() {
        let mut graph = Graph::new();
        let x = graph.constant(array![[1., 2.], [3., 4.]]);
        let b = graph.constant(array![[10., 20.]]);

        let y = graph.add_bias(x, b).unwrap();
        assert_eq!(graph.value(y).unwrap(), array![[11f32, 22.], [13., 24.]]);
    }

    #[test]
    fn relu_clamps_negatives() {
        let mut graph = Graph::new();
        let x = graph.constant(array![[-1., 0., 2.5]]);

        let y = graph.relu(x).unwrap();
        assert_eq!(graph.value(y).unwrap(), array![[0f32, 0., 2.5]]);
    }

    #[test]
    fn dot_product_scores_every_row() {
        let mut graph = Graph::new();
        let x = graph.constant(array![[1., 2.], [3., -4.], [0., 0.]]);
        let w = graph.constant(array![[2., 1.]]);

        let y = graph.dot_product(x, w).unwrap();
        assert_eq!(graph.value(y).unwrap(), array![[4f32], [2.], [0.]]);
    }

    #[test]
    fn square_loss_halves_the_mean_squared_error() {
        let mut graph = Graph::new();
        let a = graph.constant(array![[1., 2.], [3., 4.]]);
        let b = graph.constant(array![[1., 0.], [3., 0.]]);

        let loss = graph.square_loss(a, b).unwrap();
        assert_eq!(graph.as_scalar(loss).unwrap(), (4. + 16.) / 2. / 4.);
    }

    #[test]
    fn softmax_loss_of_uniform_logits() {
        let mut graph = Graph::new();
        let logits = graph.constant(Array2::zeros((2, 4)));
        let labels = graph.constant(array![[0., 1., 0., 0.], [0.25, 0.25, 0.25, 0.25]]);

        let loss = graph.softmax_loss(logits, labels).unwrap();
        let value = graph.as_scalar(loss).unwrap();
        assert!((value - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn softmax_loss_is_stable_for_large_logits() {
        let mut graph = Graph::new();
        let logits = graph.constant(array![[1000., 0.]]);
        let labels = graph.constant(array![[1., 0.]]);

        let loss = graph.softmax_loss(logits, labels).unwrap();
        let value = graph.as_scalar(loss).unwrap();
        assert!(value.is_finite());
        assert!(value.abs() < 1e-6);
    }

    #[test]
    fn softmax_loss_rejects_invalid_labels() {
        let mut graph = Graph::new();
        let logits = graph.constant(Array2::zeros((2, 2)));
        let labels = graph.constant(array![[1., 0.], [0.5, 0.6]]);

        let err = graph.softmax_loss(logits, labels).unwrap_err();
        assert_eq!(err, GraphErr::InvalidLabels { row: 1 });
    }

    #[test]
    fn shape_mismatches_fail_fast() {
        let mut graph = Graph::new();
        let x = graph.constant(Array2::zeros((3, 2)));
        let w = graph.constant(Array2::zeros((3, 2)));
        let b = graph.constant(Array2::zeros((2, 2)));

        let err = graph.linear(x, w).unwrap_err();
        assert_eq!(
            err,
            GraphErr::ShapeMismatch {
                op: "linear",
                left: (3, 2),
                right: (3, 2)
            }
        );
        assert!(graph.add_bias(x, b).is_err());
        assert!(graph.dot_product(x, w).is_err());
        assert!(graph.square_loss(x, b).is_err());
        assert!(graph.add(x, b).is_err());
    }

    #[test]
    fn as_scalar_requires_a_single_value() {
        let mut graph = Graph::new();
        let x = graph.constant(Array2::zeros((1, 2)));

        assert_eq!(
            graph.as_scalar(x).unwrap_err(),
            GraphErr::NotScalar { shape: (1, 2) }
        );
    }

    #[test]
    fn nodes_of_other_graphs_are_unknown() {
        let mut graph = Graph::new();
        let mut other = Graph::new();
        let x = graph.constant(Array2::zeros((1, 1)));
        other.constant(Array2::zeros((1, 1)));

        assert!(matches!(
            other.value(x).unwrap_err(),
            GraphErr::UnknownNode { .. }
        ));
    }

    #[test]
    fn param_snapshots_the_current_value() {
        let mut param = Parameter::from_array(array![[1., 2.]]);
        let mut graph = Graph::new();
        let node = graph.param(&param);

        param.update(array![[1., 1.]].view(), 1.).unwrap();
        assert_eq!(graph.value(node).unwrap(), array![[1f32, 2.]]);
    }
}
