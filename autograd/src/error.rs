use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::initialization::RandErr;

/// The result type used in the entire autograd crate.
pub type Result<T> = std::result::Result<T, GraphErr>;

/// The autograd crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphErr {
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    NotScalar {
        shape: (usize, usize),
    },
    UnknownNode {
        node: usize,
        len: usize,
    },
    InvalidLabels {
        row: usize,
    },
    Exhausted {
        got: usize,
        expected: usize,
    },
    EmptyShape {
        rows: usize,
        cols: usize,
    },
    Init(RandErr),
}

impl From<RandErr> for GraphErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}

impl Display for GraphErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphErr::ShapeMismatch { op, left, right } => write!(
                f,
                "Shape mismatch in {op}, got {}x{} and {}x{}",
                left.0, left.1, right.0, right.1
            ),
            GraphErr::NotScalar { shape } => write!(
                f,
                "Expected a 1x1 node, got one of shape {}x{}",
                shape.0, shape.1
            ),
            GraphErr::UnknownNode { node, len } => write!(
                f,
                "Node {node} does not belong to this graph, which has {len} nodes"
            ),
            GraphErr::InvalidLabels { row } => write!(
                f,
                "The labels at row {row} are not a probability distribution"
            ),
            GraphErr::Exhausted { got, expected } => write!(
                f,
                "The parameter generator ran out of values, got {got} of the expected {expected}"
            ),
            GraphErr::EmptyShape { rows, cols } => {
                write!(f, "A {rows}x{cols} parameter has no elements")
            }
            GraphErr::Init(e) => write!(f, "Cannot initialize the parameter: {e}"),
        }
    }
}

impl Error for GraphErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphErr::Init(e) => Some(e),
            _ => None,
        }
    }
}
