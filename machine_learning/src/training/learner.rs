use autograd::{Graph, Node};
use ndarray::{Array2, ArrayView2};

use crate::{Result, models::Classifier};

/// The recorded loss of a batch, ready to be differentiated.
pub struct LossGraph {
    pub graph: Graph,
    pub loss: Node,
    /// The nodes of the learner's parameters, in the order `Learner::apply` expects their
    /// gradients.
    pub params: Vec<Node>,
}

impl LossGraph {
    pub fn loss(&self) -> Result<f32> {
        Ok(self.graph.as_scalar(self.loss)?)
    }

    /// Computes the gradient of the loss with respect to every parameter node.
    pub fn gradients(&self) -> Result<Vec<Array2<f32>>> {
        Ok(self.graph.gradients(self.loss, &self.params)?)
    }
}

/// A model that can be trained by gradient descent.
pub trait Learner {
    /// The input type of the batches this learner consumes.
    type Input;

    /// Records the loss of the model on a batch.
    ///
    /// # Arguments
    /// * `x` - The batch inputs.
    /// * `y` - The batch targets.
    fn loss_graph(&self, x: &Self::Input, y: ArrayView2<f32>) -> Result<LossGraph>;

    /// Takes a gradient descent step with the model's learning rate.
    ///
    /// # Arguments
    /// * `gradients` - One gradient per parameter, in the order of `LossGraph::params`.
    fn apply(&mut self, gradients: &[Array2<f32>]) -> Result<()>;

    /// This learner seen as a classifier, if it is one.
    fn as_classifier(&self) -> Option<&dyn Classifier<Self::Input>> {
        None
    }
}
