use std::{
    error::Error,
    fmt::{self, Display},
};

use autograd::{GraphErr, initialization::RandErr};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    Graph(GraphErr),
    Rand(RandErr),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    OutOfRange {
        what: &'static str,
        value: usize,
        limit: usize,
    },
    BatchSize {
        batch_size: usize,
        len: usize,
    },
    EmptyDataset,
    NoValidationSplit,
    EmptySequence,
    InvalidConfig(String),
    NotConverged {
        steps: usize,
    },
}

impl From<GraphErr> for MlErr {
    fn from(value: GraphErr) -> Self {
        Self::Graph(value)
    }
}

impl From<RandErr> for MlErr {
    fn from(value: RandErr) -> Self {
        Self::Rand(value)
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::Graph(e) => format!("Graph error: {e}"),
            MlErr::Rand(e) => format!("Failed to build a random distribution: {e}"),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => format!("There's a size mismatch in {what}, got {got} and expected {expected}"),
            MlErr::OutOfRange { what, value, limit } => {
                format!("The {what} {value} is out of range, it must be lower than {limit}")
            }
            MlErr::BatchSize { batch_size, len } => format!(
                "A batch size of {batch_size} cannot be used to iterate a dataset of {len} samples"
            ),
            MlErr::EmptyDataset => "The dataset has no samples".to_string(),
            MlErr::NoValidationSplit => "The dataset has no validation split".to_string(),
            MlErr::EmptySequence => "Cannot run a recurrent model over an empty sequence".to_string(),
            MlErr::InvalidConfig(reason) => format!("Invalid configuration: {reason}"),
            MlErr::NotConverged { steps } => {
                format!("Training did not converge after {steps} steps")
            }
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Graph(e) => Some(e),
            MlErr::Rand(e) => Some(e),
            _ => None,
        }
    }
}
