//! The contract between training loops and their data, plus in-memory implementations.

mod sequence;
pub mod synthetic;
mod tabular;

use ndarray::Array2;
use rand::Rng;

pub use sequence::SequenceDataset;
pub use tabular::TabularDataset;

use crate::{Result, models::Classifier};

/// A single step's worth of training data.
///
/// The leading dimension of `x` matches the amount of rows of `y`. For sequences every step
/// array has as many rows as `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<I> {
    pub x: I,
    pub y: Array2<f32>,
}

/// A source of training batches with an optional held-out split.
pub trait Dataset {
    /// The input type of every batch.
    type Input;

    /// The amount of training samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Covers every training sample exactly once, in order.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    ///
    /// # Returns
    /// The batches or `MlErr::BatchSize` if `batch_size` cannot split the dataset.
    fn iterate_once(
        &self,
        batch_size: usize,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + '_>;

    /// Yields shuffled batches without end.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    /// * `rng` - The random number generator driving the sampling.
    ///
    /// # Returns
    /// The batches or `MlErr::BatchSize` if no batch of `batch_size` samples can be drawn.
    fn iterate_forever<'a, R: Rng + 'a>(
        &'a self,
        batch_size: usize,
        rng: R,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + 'a>;

    /// Measures the fraction of held-out samples the classifier gets right.
    ///
    /// # Returns
    /// A value in `[0, 1]` or `MlErr::NoValidationSplit` if there are no held-out samples.
    fn validation_accuracy(&self, classifier: &dyn Classifier<Self::Input>) -> Result<f32>;
}
