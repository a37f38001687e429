use std::{collections::BTreeMap, iter};

use ndarray::Array2;
use rand::Rng;

use super::{Batch, Dataset};
use crate::{MlErr, Result, models::Classifier};

/// Words of different lengths, labeled with a class.
///
/// Words are kept grouped by length so that every batch holds words of a single length. Each
/// batch input is a sequence of one-hot encoded `B x num_chars` arrays, one per character.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    num_chars: usize,
    num_classes: usize,
    train: Split,
    validation: Option<Split>,
}

#[derive(Debug, Clone)]
struct Split {
    words: Vec<Vec<usize>>,
    labels: Vec<usize>,
    buckets: BTreeMap<usize, Vec<usize>>,
}

impl Split {
    fn new(
        words: Vec<Vec<usize>>,
        labels: Vec<usize>,
        num_chars: usize,
        num_classes: usize,
    ) -> Result<Self> {
        if words.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        if words.len() != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "word labels",
                got: labels.len(),
                expected: words.len(),
            });
        }

        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, word) in words.iter().enumerate() {
            if word.is_empty() {
                return Err(MlErr::EmptySequence);
            }

            if let Some(&value) = word.iter().find(|&&c| c >= num_chars) {
                return Err(MlErr::OutOfRange {
                    what: "character",
                    value,
                    limit: num_chars,
                });
            }

            buckets.entry(word.len()).or_default().push(i);
        }

        if let Some(&value) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(MlErr::OutOfRange {
                what: "label",
                value,
                limit: num_classes,
            });
        }

        Ok(Self {
            words,
            labels,
            buckets,
        })
    }
}

impl SequenceDataset {
    /// Creates a new `SequenceDataset` without a validation split.
    ///
    /// # Arguments
    /// * `num_chars` - The size of the alphabet, characters are indices below it.
    /// * `num_classes` - The amount of classes, labels are indices below it.
    /// * `words` - The training words.
    /// * `labels` - The class of each word.
    pub fn new(
        num_chars: usize,
        num_classes: usize,
        words: Vec<Vec<usize>>,
        labels: Vec<usize>,
    ) -> Result<Self> {
        let train = Split::new(words, labels, num_chars, num_classes)?;

        Ok(Self {
            num_chars,
            num_classes,
            train,
            validation: None,
        })
    }

    /// Attaches a held-out split to this dataset.
    pub fn with_validation(mut self, words: Vec<Vec<usize>>, labels: Vec<usize>) -> Result<Self> {
        let split = Split::new(words, labels, self.num_chars, self.num_classes)?;
        self.validation = Some(split);
        Ok(self)
    }

    pub fn num_chars(&self) -> usize {
        self.num_chars
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// One-hot encodes words of a single length bucket.
    ///
    /// # Returns
    /// One `B x num_chars` array per character position.
    fn encode<'w, W>(&self, words: W) -> Vec<Array2<f32>>
    where
        W: ExactSizeIterator<Item = &'w [usize]> + Clone,
    {
        let batch_size = words.len();
        let len = words.clone().map(<[usize]>::len).min().unwrap_or(0);

        (0..len)
            .map(|t| {
                let mut step = Array2::zeros((batch_size, self.num_chars));
                for (row, word) in words.clone().enumerate() {
                    step[[row, word[t]]] = 1.;
                }
                step
            })
            .collect()
    }

    fn batch(&self, split: &Split, indices: &[usize]) -> Batch<Vec<Array2<f32>>> {
        let words = indices.iter().map(|&i| split.words[i].as_slice());
        let mut y = Array2::zeros((indices.len(), self.num_classes));
        for (row, &i) in indices.iter().enumerate() {
            y[[row, split.labels[i]]] = 1.;
        }

        Batch {
            x: self.encode(words),
            y,
        }
    }
}

impl Dataset for SequenceDataset {
    type Input = Vec<Array2<f32>>;

    fn len(&self) -> usize {
        self.train.words.len()
    }

    /// Walks every length bucket in increasing length, the last batch of each bucket may be
    /// smaller than `batch_size`.
    fn iterate_once(
        &self,
        batch_size: usize,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + '_> {
        if batch_size == 0 {
            return Err(MlErr::BatchSize {
                batch_size,
                len: self.len(),
            });
        }

        let batches = self
            .train
            .buckets
            .values()
            .flat_map(move |bucket| bucket.chunks(batch_size))
            .map(move |indices| self.batch(&self.train, indices));

        Ok(batches)
    }

    /// Picks a random word and fills the batch by sampling, with replacement, among the words
    /// of the same length.
    fn iterate_forever<'a, R: Rng + 'a>(
        &'a self,
        batch_size: usize,
        mut rng: R,
    ) -> Result<impl Iterator<Item = Batch<Self::Input>> + 'a> {
        if batch_size == 0 {
            return Err(MlErr::BatchSize {
                batch_size,
                len: self.len(),
            });
        }

        let train = &self.train;
        let batches = iter::repeat_with(move || {
            let word = rng.random_range(0..train.words.len());
            let bucket = &train.buckets[&train.words[word].len()];
            let indices: Vec<usize> = (0..batch_size)
                .map(|_| bucket[rng.random_range(0..bucket.len())])
                .collect();

            self.batch(train, &indices)
        });

        Ok(batches)
    }

    fn validation_accuracy(&self, classifier: &dyn Classifier<Self::Input>) -> Result<f32> {
        let Some(split) = &self.validation else {
            return Err(MlErr::NoValidationSplit);
        };

        let mut hits = 0;
        for indices in split.buckets.values() {
            let batch = self.batch(split, indices);
            let predictions = classifier.predict(&batch.x)?;
            if predictions.len() != indices.len() {
                return Err(MlErr::SizeMismatch {
                    what: "predictions",
                    got: predictions.len(),
                    expected: indices.len(),
                });
            }

            hits += predictions
                .iter()
                .zip(indices)
                .filter(|&(&prediction, &i)| prediction == split.labels[i])
                .count();
        }

        Ok(hits as f32 / split.words.len() as f32)
    }
}
