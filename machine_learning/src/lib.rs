//! Supervised models trained by gradient descent on top of the `autograd` engine: an online
//! perceptron, a scalar regression network, a digit classifier and a recurrent language
//! identifier.

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod training;

pub use error::{MlErr, Result};
