//! Convergence loops shared by the gradient trained models.

mod criterion;
mod learner;
mod report;
mod trainer;

pub use criterion::StopCriterion;
pub use learner::{Learner, LossGraph};
pub use report::TrainReport;
pub use trainer::Trainer;

use rand::{SeedableRng, rngs::StdRng};

/// Builds the random number generator of a training run.
///
/// # Arguments
/// * `seed` - Makes the run reproducible when given, the os entropy is used otherwise.
pub fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
