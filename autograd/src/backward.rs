use log::trace;
use ndarray::{Array2, Axis, Zip};

use crate::{
    error::{GraphErr, Result},
    graph::{Graph, Node, Op, log_softmax},
};

impl Graph {
    /// Computes the gradient of the scalar `loss` with respect to each of the given nodes.
    ///
    /// # Arguments
    /// * `loss` - A `1 x 1` node of this graph.
    /// * `nodes` - The nodes to differentiate against, usually the model's parameters.
    ///
    /// # Returns
    /// One gradient per requested node, in the same order and with the same shape as the node's
    /// value. Nodes the loss does not depend on get a gradient of zeros.
    pub fn gradients(&self, loss: Node, nodes: &[Node]) -> Result<Vec<Array2<f32>>> {
        self.as_scalar(loss)?;
        for &node in nodes {
            self.entry(node)?;
        }

        let mut grads: Vec<Option<Array2<f32>>> = vec![None; loss.index + 1];
        grads[loss.index] = Some(Array2::ones((1, 1)));

        for index in (0..=loss.index).rev() {
            let Some(grad) = grads[index].take() else {
                continue;
            };

            let op = self.nodes[index].op;
            trace!(index = index; "backpropagating through node");
            self.backward(op, &grad, &mut grads)?;
            grads[index] = Some(grad);
        }

        let grads = nodes
            .iter()
            .map(|&node| {
                grads
                    .get(node.index)
                    .and_then(Option::clone)
                    .unwrap_or_else(|| Array2::zeros(self.nodes[node.index].value.dim()))
            })
            .collect();

        Ok(grads)
    }

    /// Propagates `grad`, the gradient of a node produced by `op`, to the node's operands.
    fn backward(
        &self,
        op: Op,
        grad: &Array2<f32>,
        grads: &mut [Option<Array2<f32>>],
    ) -> Result<()> {
        match op {
            Op::Leaf => {}
            Op::Linear(x, w) => {
                let (xv, wv) = (self.get(x)?, self.get(w)?);
                accumulate(grads, x, grad.dot(&wv.t()));
                accumulate(grads, w, xv.t().dot(grad));
            }
            Op::AddBias(x, b) => {
                accumulate(grads, x, grad.clone());
                accumulate(grads, b, grad.sum_axis(Axis(0)).insert_axis(Axis(0)));
            }
            Op::Add(a, b) => {
                accumulate(grads, a, grad.clone());
                accumulate(grads, b, grad.clone());
            }
            Op::Relu(a) => {
                let mut da = grad.clone();
                Zip::from(&mut da)
                    .and(self.get(a)?)
                    .for_each(|d, &v| *d = if v > 0. { *d } else { 0. });
                accumulate(grads, a, da);
            }
            Op::DotProduct(x, w) => {
                let (xv, wv) = (self.get(x)?, self.get(w)?);
                accumulate(grads, x, grad.dot(wv));
                accumulate(grads, w, grad.t().dot(xv));
            }
            Op::SquareLoss(a, b) => {
                let (av, bv) = (self.get(a)?, self.get(b)?);
                let scale = scalar(grad)? / av.len() as f32;
                let da = (av - bv) * scale;
                accumulate(grads, b, -&da);
                accumulate(grads, a, da);
            }
            Op::SoftmaxLoss(logits, labels) => {
                let (lv, yv) = (self.get(logits)?, self.get(labels)?);
                let scale = scalar(grad)? / lv.nrows() as f32;
                let log_probs = log_softmax(lv.view());
                let dlogits = (log_probs.mapv(f32::exp) - yv) * scale;
                accumulate(grads, labels, log_probs * -scale);
                accumulate(grads, logits, dlogits);
            }
        }

        Ok(())
    }
}

fn accumulate(grads: &mut [Option<Array2<f32>>], node: Node, grad: Array2<f32>) {
    match &mut grads[node.index] {
        Some(acc) => *acc += &grad,
        slot => *slot = Some(grad),
    }
}

fn scalar(grad: &Array2<f32>) -> Result<f32> {
    match grad.dim() {
        (1, 1) => Ok(grad[[0, 0]]),
        shape => Err(GraphErr::NotScalar { shape }),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::parameter::Parameter;

    const EPS: f32 = 1e-3;
    const TOL: f32 = 1e-2;

    /// Compares the gradients of the graph built by `build` against central finite differences
    /// for the inputs listed in `wrt`.
    fn check_gradients<F>(inputs: &[Array2<f32>], wrt: &[usize], build: F)
    where
        F: Fn(&mut Graph, &[Node]) -> Node,
    {
        let eval = |arrays: &[Array2<f32>]| {
            let mut graph = Graph::new();
            let leaves: Vec<Node> = arrays.iter().map(|a| graph.constant(a.clone())).collect();
            let loss = build(&mut graph, &leaves);
            graph.as_scalar(loss).unwrap()
        };

        let mut graph = Graph::new();
        let leaves: Vec<Node> = inputs.iter().map(|a| graph.constant(a.clone())).collect();
        let loss = build(&mut graph, &leaves);
        let wrt_nodes: Vec<Node> = wrt.iter().map(|&i| leaves[i]).collect();
        let analytic = graph.gradients(loss, &wrt_nodes).unwrap();

        for (&i, grad) in wrt.iter().zip(&analytic) {
            assert_eq!(grad.dim(), inputs[i].dim());

            for ((r, c), &expected) in grad.indexed_iter() {
                let mut plus = inputs.to_vec();
                let mut minus = inputs.to_vec();
                plus[i][[r, c]] += EPS;
                minus[i][[r, c]] -= EPS;

                let numeric = (eval(&plus) - eval(&minus)) / (2. * EPS);
                assert!(
                    (numeric - expected).abs() <= TOL * expected.abs().max(1.),
                    "input {i} at ({r}, {c}): numeric {numeric} analytic {expected}"
                );
            }
        }
    }

    fn x() -> Array2<f32> {
        array![[1., 2.], [-1., 0.5], [0.3, -0.7]]
    }

    fn w1() -> Array2<f32> {
        array![[0.5, -0.3, 0.8, 0.1], [0.2, 0.4, -0.6, 0.9]]
    }

    fn b1() -> Array2<f32> {
        array![[0.1, -0.2, 0.05, 0.3]]
    }

    #[test]
    fn dense_relu_square_loss() {
        let inputs = [
            x(),
            w1(),
            b1(),
            array![[0.3], [-0.5], [0.7], [0.2]],
            array![[1.], [0.], [-1.]],
        ];

        check_gradients(&inputs, &[0, 1, 2, 3, 4], |g, n| {
            let h = g.linear(n[0], n[1]).unwrap();
            let h = g.add_bias(h, n[2]).unwrap();
            let h = g.relu(h).unwrap();
            let y = g.linear(h, n[3]).unwrap();
            g.square_loss(y, n[4]).unwrap()
        });
    }

    #[test]
    fn linear_softmax_loss() {
        let inputs = [
            x(),
            w1(),
            array![[0., 0., 1., 0.], [1., 0., 0., 0.], [0., 0.5, 0., 0.5]],
        ];

        check_gradients(&inputs, &[0, 1], |g, n| {
            let logits = g.linear(n[0], n[1]).unwrap();
            g.softmax_loss(logits, n[2]).unwrap()
        });
    }

    #[test]
    fn dot_product_square_loss() {
        let inputs = [x(), array![[0.4, -1.2]], array![[1.], [-1.], [1.]]];

        check_gradients(&inputs, &[0, 1], |g, n| {
            let score = g.dot_product(n[0], n[1]).unwrap();
            g.square_loss(score, n[2]).unwrap()
        });
    }

    #[test]
    fn reused_nodes_accumulate() {
        let inputs = [
            array![[1., 0.], [0., 1.], [1., 1.]],
            array![[0.5, -0.25], [0.75, 0.4]],
            array![[0.3, -0.6], [0.2, 0.9]],
            array![[1., 0.], [0., 1.], [0.5, 0.5]],
        ];

        // A two step recurrence sharing its weights.
        check_gradients(&inputs, &[1, 2], |g, n| {
            let h = g.linear(n[0], n[1]).unwrap();
            let h = g.relu(h).unwrap();
            let z = g.linear(n[0], n[1]).unwrap();
            let r = g.linear(h, n[2]).unwrap();
            let h = g.add(z, r).unwrap();
            g.softmax_loss(h, n[3]).unwrap()
        });
    }

    #[test]
    fn unreachable_nodes_get_zeros() {
        let mut graph = Graph::new();
        let a = graph.constant(array![[1., 2.]]);
        let b = graph.constant(array![[3., 4.]]);
        let unused = graph.constant(Array2::ones((3, 5)));
        let loss = graph.square_loss(a, b).unwrap();

        let grads = graph.gradients(loss, &[unused, a]).unwrap();
        assert_eq!(grads[0], Array2::<f32>::zeros((3, 5)));
        assert_eq!(grads[1], array![[-1f32, -1.]]);
    }

    #[test]
    fn gradients_of_the_loss_itself() {
        let mut graph = Graph::new();
        let a = graph.constant(array![[1.]]);
        let b = graph.constant(array![[0.]]);
        let loss = graph.square_loss(a, b).unwrap();

        let grads = graph.gradients(loss, &[loss]).unwrap();
        assert_eq!(grads[0], array![[1f32]]);
    }

    #[test]
    fn gradients_need_a_scalar_loss() {
        let mut graph = Graph::new();
        let a = graph.constant(array![[1., 2.]]);

        assert_eq!(
            graph.gradients(a, &[a]).unwrap_err(),
            GraphErr::NotScalar { shape: (1, 2) }
        );
    }

    #[test]
    fn gradients_reject_foreign_nodes() {
        let mut graph = Graph::new();
        let a = graph.constant(array![[1.]]);
        let loss = graph.square_loss(a, a).unwrap();

        let mut other = Graph::new();
        let foreign = other.constant(array![[1.]]);

        assert!(matches!(
            graph.gradients(loss, &[foreign]).unwrap_err(),
            GraphErr::UnknownNode { .. }
        ));
    }

    #[test]
    fn descending_along_the_gradient_lowers_the_loss() {
        let mut w = Parameter::from_array(w1());
        let y = array![[1., 0., 0., 0.], [0., 1., 0., 0.], [0., 0., 0., 1.]];

        let loss_of = |w: &Parameter| {
            let mut graph = Graph::new();
            let x = graph.constant(x());
            let w = graph.param(w);
            let y = graph.constant(y.clone());
            let logits = graph.linear(x, w).unwrap();
            let loss = graph.softmax_loss(logits, y).unwrap();
            let grads = graph.gradients(loss, &[w]).unwrap();
            (graph.as_scalar(loss).unwrap(), grads)
        };

        let (before, grads) = loss_of(&w);
        w.update(grads[0].view(), -0.1).unwrap();
        let (after, _) = loss_of(&w);

        assert!(after < before);
    }
}
