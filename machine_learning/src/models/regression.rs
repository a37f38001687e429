use std::{cell::RefCell, rc::Rc};

use autograd::{Graph, Node, Parameter};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{apply_gradients, dense, init};
use crate::{
    Result,
    config::{RegressionConfig, TrainingConfig},
    dataset::Dataset,
    training::{Learner, LossGraph, StopCriterion, TrainReport, Trainer},
};

/// A network approximating a scalar function: `1 -> hidden (ReLU) -> 1`.
#[derive(Debug, Clone)]
pub struct RegressionModel {
    w1: Parameter,
    b1: Parameter,
    w2: Parameter,
    b2: Parameter,
    config: RegressionConfig,
}

impl RegressionModel {
    /// Creates a new `RegressionModel`.
    ///
    /// # Arguments
    /// * `config` - The model's hyperparameters.
    /// * `rng` - The random number generator used to initialize the parameters.
    pub fn new<R: Rng>(config: RegressionConfig, rng: &Rc<RefCell<R>>) -> Result<Self> {
        config.validate()?;
        let hidden = config.hidden_size;

        Ok(Self {
            w1: init(rng, 1, hidden)?,
            b1: init(rng, 1, hidden)?,
            w2: init(rng, hidden, 1)?,
            b2: init(rng, 1, 1)?,
            config,
        })
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Records the forward pass of `x` (`B x 1`).
    ///
    /// # Returns
    /// The `B x 1` predictions and the parameter nodes in `Learner::apply` order.
    fn forward(&self, graph: &mut Graph, x: Node) -> Result<(Node, Vec<Node>)> {
        let params = [&self.w1, &self.b1, &self.w2, &self.b2].map(|p| graph.param(p));
        let [w1, b1, w2, b2] = params;

        let hidden = dense(graph, x, w1, b1)?;
        let hidden = graph.relu(hidden)?;
        let y = dense(graph, hidden, w2, b2)?;

        Ok((y, params.to_vec()))
    }

    /// Predicts the output of every row of `x` (`B x 1`), resulting in a `B x 1` array.
    pub fn run(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut graph = Graph::new();
        let x = graph.constant(x.to_owned());
        let (y, _) = self.forward(&mut graph, x)?;
        Ok(graph.value(y)?.to_owned())
    }

    /// The square loss of the predictions of `x` against `y`.
    pub fn get_loss(&self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        self.loss_graph(&x.to_owned(), y)?.loss()
    }

    /// Trains on batches drawn forever from `dataset` until a single batch's loss drops below
    /// the configured threshold.
    pub fn train<D>(&mut self, dataset: &D, training: &TrainingConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = Array2<f32>>,
    {
        training.validate()?;
        let criterion = StopCriterion::LossBelow(self.config.loss_threshold);
        Trainer::from_config(self.config.batch_size, criterion, training).train(self, dataset)
    }
}

impl Learner for RegressionModel {
    type Input = Array2<f32>;

    fn loss_graph(&self, x: &Array2<f32>, y: ArrayView2<f32>) -> Result<LossGraph> {
        let mut graph = Graph::new();
        let x = graph.constant(x.clone());
        let y = graph.constant(y.to_owned());

        let (prediction, params) = self.forward(&mut graph, x)?;
        let loss = graph.square_loss(prediction, y)?;

        Ok(LossGraph {
            graph,
            loss,
            params,
        })
    }

    /// Expects the gradients of `w1`, `b1`, `w2` and `b2`.
    fn apply(&mut self, gradients: &[Array2<f32>]) -> Result<()> {
        let params = [&mut self.w1, &mut self.b1, &mut self.w2, &mut self.b2];
        apply_gradients(params, gradients, self.config.learning_rate)
    }
}
