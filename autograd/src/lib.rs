//! A small reverse mode differentiation engine over 2D `f32` arrays.
//!
//! Computations are recorded on a `Graph` as they run. Once a scalar loss has been built,
//! `Graph::gradients` returns its gradient with respect to any recorded node, which callers
//! feed back into `Parameter::update`.

mod backward;
mod error;
mod graph;
pub mod initialization;
mod parameter;

pub use error::{GraphErr, Result};
pub use graph::{Graph, Node};
pub use parameter::Parameter;
