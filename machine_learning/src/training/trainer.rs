use log::{debug, info};
use rand::{Rng, rngs::StdRng};

use super::{Learner, StopCriterion, TrainReport, generate_rng};
use crate::{MlErr, Result, config::TrainingConfig, dataset::Dataset};

/// Drives a `Learner` over an endless stream of batches until its `StopCriterion` is met.
pub struct Trainer<R: Rng> {
    batch_size: usize,
    criterion: StopCriterion,
    max_steps: Option<usize>,
    rng: R,
}

impl<R: Rng> Trainer<R> {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per step.
    /// * `criterion` - When to stop training.
    /// * `max_steps` - Fail with `MlErr::NotConverged` after this many steps, if given.
    /// * `rng` - Drives the batch sampling.
    pub fn new(
        batch_size: usize,
        criterion: StopCriterion,
        max_steps: Option<usize>,
        rng: R,
    ) -> Self {
        Self {
            batch_size,
            criterion,
            max_steps,
            rng,
        }
    }

    /// Trains `learner` on `dataset`.
    ///
    /// Every step draws a batch and checks the criterion: a validation accuracy criterion is
    /// checked before the loss is recorded, a loss criterion on the batch's loss. If it isn't
    /// met, the gradients of the loss are applied to the learner.
    ///
    /// # Returns
    /// A report of the run, or an error if the criterion can't be evaluated, `max_steps` is
    /// exceeded or the learner fails.
    pub fn train<L, D>(&mut self, learner: &mut L, dataset: &D) -> Result<TrainReport>
    where
        L: Learner,
        D: Dataset<Input = L::Input>,
    {
        info!(
            batch_size = self.batch_size,
            samples = dataset.len();
            "training until {}", self.criterion
        );

        let mut report = TrainReport::default();
        let batches = dataset.iterate_forever(self.batch_size, &mut self.rng)?;

        for batch in batches {
            if let StopCriterion::ValidationAccuracy(_) = self.criterion {
                let classifier = learner.as_classifier().ok_or_else(|| {
                    MlErr::InvalidConfig("validation accuracy needs a classifier".to_string())
                })?;

                let accuracy = dataset.validation_accuracy(classifier)?;
                report.last_accuracy = Some(accuracy);
                debug!(step = report.steps, accuracy = accuracy; "validation accuracy");

                if self.criterion.accuracy_reached(accuracy) {
                    break;
                }
            }

            if self.max_steps.is_some_and(|max| report.steps >= max) {
                return Err(MlErr::NotConverged {
                    steps: report.steps,
                });
            }

            let loss_graph = learner.loss_graph(&batch.x, batch.y.view())?;
            let loss = loss_graph.loss()?;
            report.steps += 1;
            report.last_loss = Some(loss);
            debug!(step = report.steps, loss = loss; "batch loss");

            if self.criterion.loss_reached(loss) {
                break;
            }

            let gradients = loss_graph.gradients()?;
            learner.apply(&gradients)?;
            report.updates += 1;
        }

        info!(steps = report.steps, updates = report.updates; "training finished");
        Ok(report)
    }
}

impl Trainer<StdRng> {
    /// Creates a new `Trainer` whose rng and bounds come from a `TrainingConfig`.
    pub fn from_config(
        batch_size: usize,
        criterion: StopCriterion,
        config: &TrainingConfig,
    ) -> Self {
        let rng = generate_rng(config.seed);
        Self::new(batch_size, criterion, config.max_steps, rng)
    }
}
