/// The outcome of a converged training run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainReport {
    /// Batches drawn, or passes over the dataset for the perceptron.
    pub steps: usize,
    /// Parameter updates applied.
    pub updates: usize,
    /// The loss of the last batch, if the loop computes one.
    pub last_loss: Option<f32>,
    /// The last held-out accuracy, if the loop measures it.
    pub last_accuracy: Option<f32>,
}
