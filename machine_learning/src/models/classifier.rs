use ndarray::{ArrayView2, Axis};

use crate::Result;

/// A model that assigns a class to every sample of a batch.
pub trait Classifier<I> {
    /// Predicts the class of every row of `x`.
    ///
    /// # Returns
    /// One class index per sample.
    fn predict(&self, x: &I) -> Result<Vec<usize>>;
}

/// The index of the largest value of every row, ties resolve to the first one.
pub fn argmax_rows(scores: ArrayView2<f32>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
                    if v > max { (i, v) } else { (best, max) }
                })
                .0
        })
        .collect()
}
