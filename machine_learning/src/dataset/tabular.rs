use std::iter;

use ndarray::{Array2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use super::{Batch, Dataset};
use crate::{MlErr, Result, models::Classifier};

/// An in-memory dataset of `N x D` inputs and `N x K` targets.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    x: Array2<f32>,
    y: Array2<f32>,
    validation: Option<(Array2<f32>, Array2<f32>)>,
}

impl TabularDataset {
    /// Creates a new `TabularDataset` without a validation split.
    ///
    /// # Arguments
    /// * `x` - The inputs, one sample per row.
    /// * `y` - The targets, one sample per row.
    ///
    /// # Returns
    /// The dataset or an error if it's empty or the amount of rows differ.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        check_split(&x, &y)?;

        Ok(Self {
            x,
            y,
            validation: None,
        })
    }

    /// Attaches a held-out split to this dataset.
    ///
    /// # Returns
    /// The dataset or an error if the split is empty or doesn't have the training columns.
    pub fn with_validation(mut self, x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        check_split(&x, &y)?;
        check_cols("validation inputs", &x, &self.x)?;
        check_cols("validation targets", &y, &self.y)?;

        self.validation = Some((x, y));
        Ok(self)
    }

    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    fn select(&self, indices: &[usize]) -> Batch<Array2<f32>> {
        Batch {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}

impl Dataset for TabularDataset {
    type Input = Array2<f32>;

    fn len(&self) -> usize {
        self.x.nrows()
    }

    fn iterate_once(
        &self,
        batch_size: usize,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + '_> {
        let len = self.len();
        if batch_size == 0 || len % batch_size != 0 {
            return Err(MlErr::BatchSize { batch_size, len });
        }

        let batches = (0..len).step_by(batch_size).map(move |start| {
            let end = start + batch_size;
            Batch {
                x: self.x.slice(s![start..end, ..]).to_owned(),
                y: self.y.slice(s![start..end, ..]).to_owned(),
            }
        });

        Ok(batches)
    }

    fn iterate_forever<'a, R: Rng + 'a>(
        &'a self,
        batch_size: usize,
        mut rng: R,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + 'a> {
        let len = self.len();
        if batch_size == 0 || batch_size > len {
            return Err(MlErr::BatchSize { batch_size, len });
        }

        let mut order: Vec<usize> = (0..len).collect();
        let mut cursor = len;

        // Every pass reshuffles the samples and drops the remainder that doesn't fill a batch.
        let batches = iter::repeat_with(move || {
            if cursor + batch_size > len {
                order.shuffle(&mut rng);
                cursor = 0;
            }

            let batch = self.select(&order[cursor..cursor + batch_size]);
            cursor += batch_size;
            batch
        });

        Ok(batches)
    }

    fn validation_accuracy(&self, classifier: &dyn Classifier<Self::Input>) -> Result<f32> {
        let Some((x, y)) = &self.validation else {
            return Err(MlErr::NoValidationSplit);
        };

        let predictions = classifier.predict(x)?;
        if predictions.len() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "predictions",
                got: predictions.len(),
                expected: y.nrows(),
            });
        }

        let labels = crate::models::argmax_rows(y.view());
        let hits = predictions
            .iter()
            .zip(&labels)
            .filter(|(prediction, label)| prediction == label)
            .count();

        Ok(hits as f32 / labels.len() as f32)
    }
}

fn check_split(x: &Array2<f32>, y: &Array2<f32>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(MlErr::EmptyDataset);
    }

    if x.nrows() != y.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "dataset targets",
            got: y.nrows(),
            expected: x.nrows(),
        });
    }

    Ok(())
}

fn check_cols(what: &'static str, got: &Array2<f32>, expected: &Array2<f32>) -> Result<()> {
    if got.ncols() != expected.ncols() {
        return Err(MlErr::SizeMismatch {
            what,
            got: got.ncols(),
            expected: expected.ncols(),
        });
    }

    Ok(())
}
