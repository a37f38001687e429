//! Seeded, in-memory stand-ins for the datasets each model is meant to learn.

use std::f32::consts::PI;

use autograd::initialization;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;

use super::{SequenceDataset, TabularDataset};
use crate::{
    MlErr, Result,
    models::{DIGIT_CLASSES, DIGIT_PIXELS, LANGUAGES, NUM_CHARS},
};

/// Probability of a pixel being lit in a digit prototype.
const PROTOTYPE_DENSITY: f32 = 0.2;
/// Probability of a pixel being flipped when drawing a digit from its prototype.
const PIXEL_NOISE: f32 = 0.1;
/// Amount of characters each language favours.
const LANGUAGE_BLOCK: usize = 9;
/// Probability of a character being drawn from its language's block.
const LANGUAGE_PURITY: f64 = 0.9;

/// Points labeled `+1` or `-1` by a random hyperplane, none of them closer to it than a tenth
/// of its norm.
///
/// # Arguments
/// * `rng` - The random number generator.
/// * `samples` - The amount of points.
/// * `dimensions` - The dimensions of each point, the last one is a constant `1` bias feature.
pub fn separable_points<R: Rng>(
    rng: &mut R,
    samples: usize,
    dimensions: usize,
) -> Result<TabularDataset> {
    if dimensions < 2 {
        return Err(MlErr::InvalidConfig(format!(
            "separable points need at least 2 dimensions, got {dimensions}"
        )));
    }

    let features = initialization::uniform(-1., 1.)?;
    let hyperplane = Array1::random_using(dimensions, &features, rng);
    let margin = 0.1 * hyperplane.dot(&hyperplane).sqrt();

    let mut x = Array2::zeros((samples, dimensions));
    let mut y = Array2::zeros((samples, 1));
    let mut filled = 0;

    while filled < samples {
        let mut point = Array1::random_using(dimensions, &features, rng);
        point[dimensions - 1] = 1.;

        let score = point.dot(&hyperplane);
        if score.abs() < margin {
            continue;
        }

        x.row_mut(filled).assign(&point);
        y[[filled, 0]] = if score >= 0. { 1. } else { -1. };
        filled += 1;
    }

    TabularDataset::new(x, y)
}

/// `samples` evenly spaced points of `sin(x)` over `[-2π, 2π]`.
pub fn sine(samples: usize) -> Result<TabularDataset> {
    let step = 4. * PI / samples.saturating_sub(1).max(1) as f32;
    let x = Array1::from_shape_fn(samples, |i| -2. * PI + i as f32 * step).insert_axis(Axis(1));
    let y = x.mapv(f32::sin);
    TabularDataset::new(x, y)
}

/// Noisy `28 x 28` images drawn from one random prototype per digit, with one-hot targets.
///
/// # Arguments
/// * `rng` - The random number generator.
/// * `train_per_class` - The amount of training images per digit.
/// * `validation_per_class` - The amount of held-out images per digit.
pub fn digits<R: Rng>(
    rng: &mut R,
    train_per_class: usize,
    validation_per_class: usize,
) -> Result<TabularDataset> {
    let pixels = initialization::uniform(0., 1.)?;
    let prototypes = Array2::random_using((DIGIT_CLASSES, DIGIT_PIXELS), pixels, rng)
        .mapv(|v| if v < PROTOTYPE_DENSITY { 1. } else { 0. });

    let (x, y) = digit_split(rng, &prototypes, train_per_class)?;
    let (val_x, val_y) = digit_split(rng, &prototypes, validation_per_class)?;

    TabularDataset::new(x, y)?.with_validation(val_x, val_y)
}

fn digit_split<R: Rng>(
    rng: &mut R,
    prototypes: &Array2<f32>,
    per_class: usize,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let samples = per_class * DIGIT_CLASSES;
    let noise = initialization::uniform(0., 1.)?;
    let mut x = Array2::random_using((samples, DIGIT_PIXELS), noise, rng);
    let mut y = Array2::zeros((samples, DIGIT_CLASSES));

    for (i, mut row) in x.rows_mut().into_iter().enumerate() {
        let class = i % DIGIT_CLASSES;
        row.zip_mut_with(&prototypes.row(class), |noise, &pixel| {
            *noise = if *noise < PIXEL_NOISE { 1. - pixel } else { pixel };
        });
        y[[i, class]] = 1.;
    }

    Ok((x, y))
}

/// Words from five made up languages over the 47 character alphabet. Each language favours its
/// own block of characters, so longer words are easier to tell apart.
///
/// # Arguments
/// * `rng` - The random number generator.
/// * `train_per_language` - The amount of training words per language.
/// * `validation_per_language` - The amount of held-out words per language.
/// * `max_len` - The maximum length of a word, lengths are uniform in `[1, max_len]`.
pub fn languages<R: Rng>(
    rng: &mut R,
    train_per_language: usize,
    validation_per_language: usize,
    max_len: usize,
) -> Result<SequenceDataset> {
    if max_len == 0 {
        return Err(MlErr::EmptySequence);
    }

    let (words, labels) = language_split(rng, train_per_language, max_len);
    let (val_words, val_labels) = language_split(rng, validation_per_language, max_len);

    SequenceDataset::new(NUM_CHARS, LANGUAGES.len(), words, labels)?
        .with_validation(val_words, val_labels)
}

fn language_split<R: Rng>(
    rng: &mut R,
    per_language: usize,
    max_len: usize,
) -> (Vec<Vec<usize>>, Vec<usize>) {
    let samples = per_language * LANGUAGES.len();
    let mut words = Vec::with_capacity(samples);
    let mut labels = Vec::with_capacity(samples);

    for i in 0..samples {
        let language = i % LANGUAGES.len();
        let block = language * LANGUAGE_BLOCK;
        let len = rng.random_range(1..=max_len);

        let word: Vec<usize> = (0..len)
            .map(|_| {
                if rng.random_bool(LANGUAGE_PURITY) {
                    block + rng.random_range(0..LANGUAGE_BLOCK)
                } else {
                    rng.random_range(0..NUM_CHARS)
                }
            })
            .collect();

        words.push(word);
        labels.push(language);
    }

    (words, labels)
}
