use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{
    error::{GraphErr, Result},
    initialization::{ParamGen, RandParamGen},
};

/// A trainable matrix. Its shape is fixed at construction, only its values change through
/// `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    data: Array2<f32>,
}

impl Parameter {
    /// Creates a new randomly initialized `rows x cols` parameter, sampled uniformly from
    /// `[-l, l]` with `l = sqrt(3 / mean(rows, cols))` using the thread's rng.
    ///
    /// # Returns
    /// The new parameter or `GraphErr::EmptyShape` if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let rng = Rc::new(RefCell::new(rand::rng()));
        Self::random(rows, cols, &rng)
    }

    /// Same as `Parameter::new`, but sampling from a caller provided rng so that
    /// initialization can be reproduced.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows of the parameter.
    /// * `cols` - The amount of columns of the parameter.
    /// * `rng` - The shared random number generator.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &Rc<RefCell<R>>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GraphErr::EmptyShape { rows, cols });
        }

        let mut param_gen = RandParamGen::mean_fan(Rc::clone(rng), (rows, cols))?;
        Self::generate(rows, cols, &mut param_gen)
    }

    /// Creates a new `rows x cols` parameter taking its values from a parameter generator.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows of the parameter.
    /// * `cols` - The amount of columns of the parameter.
    /// * `param_gen` - The generator to take the values from, in row major order.
    ///
    /// # Returns
    /// The new parameter or `GraphErr::Exhausted` if the generator ran out of values.
    pub fn generate<P: ParamGen>(rows: usize, cols: usize, param_gen: &mut P) -> Result<Self> {
        let expected = rows * cols;
        let values = param_gen.sample(expected).unwrap_or_default();

        if values.len() != expected {
            return Err(GraphErr::Exhausted {
                got: values.len(),
                expected,
            });
        }

        let data = Array2::from_shape_vec((rows, cols), values).map_err(|_| GraphErr::Exhausted {
            got: 0,
            expected,
        })?;

        Ok(Self { data })
    }

    /// Wraps an already initialized array.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Moves the parameter in place along `direction`: `data += multiplier * direction`.
    ///
    /// # Arguments
    /// * `direction` - An array with the same shape as this parameter.
    /// * `multiplier` - The step size, negative to descend.
    ///
    /// # Returns
    /// `GraphErr::ShapeMismatch` if `direction` does not have this parameter's shape.
    pub fn update(&mut self, direction: ArrayView2<f32>, multiplier: f32) -> Result<()> {
        if direction.dim() != self.data.dim() {
            return Err(GraphErr::ShapeMismatch {
                op: "update",
                left: self.data.dim(),
                right: direction.dim(),
            });
        }

        self.data.scaled_add(multiplier, &direction);
        Ok(())
    }
}
