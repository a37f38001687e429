use std::fmt::{self, Display};

/// When a training loop stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopCriterion {
    /// As soon as a single batch's loss is strictly below the threshold.
    LossBelow(f32),
    /// As soon as the held-out accuracy reaches the threshold, checked before every step.
    ValidationAccuracy(f32),
}

impl StopCriterion {
    pub fn loss_reached(&self, loss: f32) -> bool {
        matches!(*self, StopCriterion::LossBelow(threshold) if loss < threshold)
    }

    pub fn accuracy_reached(&self, accuracy: f32) -> bool {
        matches!(*self, StopCriterion::ValidationAccuracy(threshold) if accuracy >= threshold)
    }
}

impl Display for StopCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCriterion::LossBelow(threshold) => write!(f, "loss < {threshold}"),
            StopCriterion::ValidationAccuracy(threshold) => write!(f, "accuracy >= {threshold}"),
        }
    }
}
