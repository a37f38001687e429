use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{ParamGen, RandErr, Result};

/// Builds the uniform distribution over `[low, high)`.
///
/// # Returns
/// An error if the range is empty or not finite.
pub fn uniform(low: f32, high: f32) -> Result<Uniform<f32>> {
    Uniform::new(low, high).map_err(|e| RandErr::new(low, high, e))
}

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator, shared between the generators of a model.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a generator for a single `rows x cols` parameter, sampling uniformly from
    /// `[-l, l]` where `l = sqrt(3 / mean(rows, cols))`.
    ///
    /// This is the default initialization of every `Parameter`.
    ///
    /// # Returns
    /// An error if the shape has no elements.
    pub fn mean_fan(rng: Rc<RefCell<R>>, (rows, cols): (usize, usize)) -> Result<Self> {
        let mean = (rows + cols) as f32 / 2.;
        let limit = (3. / mean).sqrt();
        Ok(Self::new(rng, uniform(-limit, limit)?, rows * cols))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        let sample = (0..n).map(|_| self.distribution.sample(&mut *rng)).collect();
        Some(sample)
    }
}
