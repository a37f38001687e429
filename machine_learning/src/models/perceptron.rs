use std::{cell::RefCell, rc::Rc};

use autograd::{Graph, Node, Parameter};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::init;
use crate::{
    MlErr, Result, config::PerceptronConfig, dataset::Dataset, training::TrainReport,
};

/// A binary linear classifier with labels `+1` and `-1`.
#[derive(Debug, Clone)]
pub struct PerceptronModel {
    w: Parameter,
    max_epochs: Option<usize>,
}

impl PerceptronModel {
    /// Creates a new `PerceptronModel` with randomly initialized weights.
    ///
    /// # Arguments
    /// * `dimensions` - The dimensions of the data.
    /// * `rng` - The random number generator used to initialize the weights.
    pub fn new<R: Rng>(dimensions: usize, rng: &Rc<RefCell<R>>) -> Result<Self> {
        Ok(Self {
            w: init(rng, 1, dimensions)?,
            max_epochs: None,
        })
    }

    pub fn from_config<R: Rng>(config: &PerceptronConfig, rng: &Rc<RefCell<R>>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            max_epochs: config.max_epochs,
            ..Self::new(config.dimensions, rng)?
        })
    }

    /// Creates a new `PerceptronModel` with the given `1 x dimensions` weights.
    pub fn with_weights(w: Parameter) -> Self {
        Self {
            w,
            max_epochs: None,
        }
    }

    pub fn get_weights(&self) -> &Parameter {
        &self.w
    }

    /// Records the score of every row of `x` against the weights.
    pub fn run(&self, graph: &mut Graph, x: Node) -> Result<Node> {
        let w = graph.param(&self.w);
        Ok(graph.dot_product(x, w)?)
    }

    /// The signed score of a single `1 x dimensions` sample.
    pub fn score(&self, x: ArrayView2<f32>) -> Result<f32> {
        if x.nrows() != 1 {
            return Err(MlErr::SizeMismatch {
                what: "perceptron samples",
                got: x.nrows(),
                expected: 1,
            });
        }

        let mut graph = Graph::new();
        let x = graph.constant(x.to_owned());
        let score = self.run(&mut graph, x)?;
        Ok(graph.as_scalar(score)?)
    }

    /// Classifies a single sample, a score of exactly zero counts as `+1`.
    pub fn get_prediction(&self, x: ArrayView2<f32>) -> Result<i8> {
        let prediction = if self.score(x)? >= 0. { 1 } else { -1 };
        Ok(prediction)
    }

    /// Scans the dataset one sample at a time, adding `label * x` to the weights for every
    /// misclassified sample, until a whole pass makes no mistakes.
    ///
    /// # Returns
    /// The amount of passes and updates, `MlErr::SizeMismatch` if the targets aren't a single
    /// column of labels or `MlErr::NotConverged` if `max_epochs` passes were not enough.
    pub fn train<D>(&mut self, dataset: &D) -> Result<TrainReport>
    where
        D: Dataset<Input = Array2<f32>>,
    {
        info!(samples = dataset.len(); "training perceptron");

        let mut report = TrainReport::default();

        loop {
            if self.max_epochs.is_some_and(|max| report.steps >= max) {
                return Err(MlErr::NotConverged {
                    steps: report.steps,
                });
            }

            let mut mistakes = 0;
            for batch in dataset.iterate_once(1)? {
                let label = sample_label(&batch.y)?;
                if f32::from(self.get_prediction(batch.x.view())?) != label {
                    self.w.update(batch.x.view(), label)?;
                    mistakes += 1;
                }
            }

            report.steps += 1;
            report.updates += mistakes;
            debug!(epoch = report.steps, mistakes = mistakes; "perceptron pass");

            if mistakes == 0 {
                break;
            }
        }

        info!(epochs = report.steps, updates = report.updates; "perceptron converged");
        Ok(report)
    }
}

/// The `+1` or `-1` label of a single sample batch.
fn sample_label(y: &Array2<f32>) -> Result<f32> {
    match y.dim() {
        (1, 1) => Ok(y[[0, 0]]),
        (_, cols) => Err(MlErr::SizeMismatch {
            what: "perceptron labels",
            got: cols,
            expected: 1,
        }),
    }
}
