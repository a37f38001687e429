//! The four supervised models and the pieces they share.

mod classifier;
mod digits;
mod language_id;
mod perceptron;
mod regression;

use std::{cell::RefCell, rc::Rc};

use autograd::{Graph, Node, Parameter};
use ndarray::Array2;
use rand::Rng;

pub use classifier::{Classifier, argmax_rows};
pub use digits::{DIGIT_CLASSES, DIGIT_PIXELS, DigitClassificationModel};
pub use language_id::{LANGUAGES, LanguageIDModel, NUM_CHARS};
pub use perceptron::PerceptronModel;
pub use regression::RegressionModel;

use crate::{MlErr, Result};

/// Creates a `rows x cols` parameter with the default uniform initialization, drawn from `rng`.
pub(crate) fn init<R: Rng>(rng: &Rc<RefCell<R>>, rows: usize, cols: usize) -> Result<Parameter> {
    Ok(Parameter::random(rows, cols, rng)?)
}

/// `x * w + b`.
pub(crate) fn dense(graph: &mut Graph, x: Node, w: Node, b: Node) -> Result<Node> {
    let z = graph.linear(x, w)?;
    Ok(graph.add_bias(z, b)?)
}

/// Moves every parameter by `learning_rate` times its gradient, in order.
pub(crate) fn apply_gradients<const N: usize>(
    params: [&mut Parameter; N],
    gradients: &[Array2<f32>],
    learning_rate: f32,
) -> Result<()> {
    if gradients.len() != N {
        return Err(MlErr::SizeMismatch {
            what: "gradients",
            got: gradients.len(),
            expected: N,
        });
    }

    for (param, gradient) in params.into_iter().zip(gradients) {
        param.update(gradient.view(), learning_rate)?;
    }

    Ok(())
}
