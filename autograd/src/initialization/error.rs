use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::uniform::Error as UniformError;

pub type Result<T> = std::result::Result<T, RandErr>;

/// Error returned when a uniform distribution cannot be built over the requested range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandErr {
    pub low: f32,
    pub high: f32,
    source: UniformError,
}

impl RandErr {
    pub(super) fn new(low: f32, high: f32, source: UniformError) -> Self {
        Self { low, high, source }
    }
}

impl Display for RandErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot sample uniformly from [{}, {}): {}",
            self.low, self.high, self.source
        )
    }
}

impl Error for RandErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}
