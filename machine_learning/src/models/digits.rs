use std::{cell::RefCell, rc::Rc};

use autograd::{Graph, Node, Parameter};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Classifier, apply_gradients, argmax_rows, dense, init};
use crate::{
    Result,
    config::{DigitConfig, TrainingConfig},
    dataset::Dataset,
    training::{Learner, LossGraph, StopCriterion, TrainReport, Trainer},
};

/// The amount of pixels of a flattened `28 x 28` digit image.
pub const DIGIT_PIXELS: usize = 784;
/// The amount of digits.
pub const DIGIT_CLASSES: usize = 10;

/// Classifies flattened digit images: `784 -> hidden (ReLU) -> 10` logits.
#[derive(Debug, Clone)]
pub struct DigitClassificationModel {
    w1: Parameter,
    b1: Parameter,
    w2: Parameter,
    b2: Parameter,
    config: DigitConfig,
}

impl DigitClassificationModel {
    /// Creates a new `DigitClassificationModel`.
    ///
    /// # Arguments
    /// * `config` - The model's hyperparameters.
    /// * `rng` - The random number generator used to initialize the parameters.
    pub fn new<R: Rng>(config: DigitConfig, rng: &Rc<RefCell<R>>) -> Result<Self> {
        config.validate()?;
        let hidden = config.hidden_size;

        Ok(Self {
            w1: init(rng, DIGIT_PIXELS, hidden)?,
            b1: init(rng, 1, hidden)?,
            w2: init(rng, hidden, DIGIT_CLASSES)?,
            b2: init(rng, 1, DIGIT_CLASSES)?,
            config,
        })
    }

    pub fn config(&self) -> &DigitConfig {
        &self.config
    }

    fn forward(&self, graph: &mut Graph, x: Node) -> Result<(Node, Vec<Node>)> {
        let params = [&self.w1, &self.b1, &self.w2, &self.b2].map(|p| graph.param(p));
        let [w1, b1, w2, b2] = params;

        let hidden = dense(graph, x, w1, b1)?;
        let hidden = graph.relu(hidden)?;
        let logits = dense(graph, hidden, w2, b2)?;

        Ok((logits, params.to_vec()))
    }

    /// Computes the `B x 10` logits of a `B x 784` batch of images.
    pub fn run(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut graph = Graph::new();
        let x = graph.constant(x.to_owned());
        let (logits, _) = self.forward(&mut graph, x)?;
        Ok(graph.value(logits)?.to_owned())
    }

    /// The softmax loss of the logits of `x` against the one-hot targets `y`.
    pub fn get_loss(&self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        self.loss_graph(&x.to_owned(), y)?.loss()
    }

    /// Trains on batches drawn forever from `dataset` until its validation accuracy reaches
    /// the configured threshold.
    pub fn train<D>(&mut self, dataset: &D, training: &TrainingConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = Array2<f32>>,
    {
        training.validate()?;
        let criterion = StopCriterion::ValidationAccuracy(self.config.accuracy_threshold);
        Trainer::from_config(self.config.batch_size, criterion, training).train(self, dataset)
    }
}

impl Classifier<Array2<f32>> for DigitClassificationModel {
    fn predict(&self, x: &Array2<f32>) -> Result<Vec<usize>> {
        let logits = self.run(x.view())?;
        Ok(argmax_rows(logits.view()))
    }
}

impl Learner for DigitClassificationModel {
    type Input = Array2<f32>;

    fn loss_graph(&self, x: &Array2<f32>, y: ArrayView2<f32>) -> Result<LossGraph> {
        let mut graph = Graph::new();
        let x = graph.constant(x.clone());
        let y = graph.constant(y.to_owned());

        let (logits, params) = self.forward(&mut graph, x)?;
        let loss = graph.softmax_loss(logits, y)?;

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

    fn as_classifier(&self) -> Option<&dyn Classifier<Array2<f32>>> {
        Some(self)
    }
}
