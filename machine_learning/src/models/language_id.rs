use std::{cell::RefCell, rc::Rc};

use autograd::{Graph, Node, Parameter};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Classifier, apply_gradients, argmax_rows, dense, init};
use crate::{
    MlErr, Result,
    config::{LanguageIdConfig, TrainingConfig},
    dataset::Dataset,
    training::{Learner, LossGraph, StopCriterion, TrainReport, Trainer},
};

/// The size of the combined alphabet of every language.
pub const NUM_CHARS: usize = 47;
/// The languages told apart, in label order.
pub const LANGUAGES: [&str; 5] = ["English", "Spanish", "Finnish", "Dutch", "Polish"];

/// Identifies the language of a word with a recurrent network.
///
/// The word is folded character by character into a hidden state:
/// `h0 = ReLU(x0 * W_hidden)` and `ht = ReLU(xt * W_hidden + h(t-1) * W_hidden2)`, with no bias
/// in the recurrence. The final state goes through two dense ReLU layers and a dense projection
/// to one logit per language.
#[derive(Debug, Clone)]
pub struct LanguageIDModel {
    w_hidden: Parameter,
    w_hidden2: Parameter,
    w1: Parameter,
    b1: Parameter,
    w2: Parameter,
    b2: Parameter,
    w3: Parameter,
    b3: Parameter,
    config: LanguageIdConfig,
}

impl LanguageIDModel {
    /// Creates a new `LanguageIDModel`.
    ///
    /// # Arguments
    /// * `config` - The model's hyperparameters.
    /// * `rng` - The random number generator used to initialize the parameters.
    pub fn new<R: Rng>(config: LanguageIdConfig, rng: &Rc<RefCell<R>>) -> Result<Self> {
        config.validate()?;
        let hidden = config.hidden_size;
        let languages = LANGUAGES.len();

        Ok(Self {
            w_hidden: init(rng, NUM_CHARS, hidden)?,
            w_hidden2: init(rng, hidden, hidden)?,
            w1: init(rng, hidden, hidden)?,
            b1: init(rng, 1, hidden)?,
            w2: init(rng, hidden, hidden)?,
            b2: init(rng, 1, hidden)?,
            w3: init(rng, hidden, languages)?,
            b3: init(rng, 1, languages)?,
            config,
        })
    }

    pub fn config(&self) -> &LanguageIdConfig {
        &self.config
    }

    /// Records the forward pass of a word batch.
    ///
    /// # Returns
    /// The `B x 5` logits and the parameter nodes in `Learner::apply` order.
    fn forward(&self, graph: &mut Graph, xs: &[Array2<f32>]) -> Result<(Node, Vec<Node>)> {
        let (first, rest) = xs.split_first().ok_or(MlErr::EmptySequence)?;

        let params = [
            &self.w_hidden,
            &self.w_hidden2,
            &self.w1,
            &self.b1,
            &self.w2,
            &self.b2,
            &self.w3,
            &self.b3,
        ]
        .map(|p| graph.param(p));
        let [w_hidden, w_hidden2, w1, b1, w2, b2, w3, b3] = params;

        let x = graph.constant(first.clone());
        let z = graph.linear(x, w_hidden)?;
        let seed = graph.relu(z)?;

        let h = rest.iter().try_fold(seed, |h, x| {
            let x = graph.constant(x.clone());
            let z = graph.linear(x, w_hidden)?;
            let r = graph.linear(h, w_hidden2)?;
            let s = graph.add(z, r)?;
            graph.relu(s)
        })?;

        let h = dense(graph, h, w1, b1)?;
        let h = graph.relu(h)?;
        let h = dense(graph, h, w2, b2)?;
        let h = graph.relu(h)?;
        let logits = dense(graph, h, w3, b3)?;

        Ok((logits, params.to_vec()))
    }

    /// Computes the `B x 5` logits of a batch of words of length `L`.
    ///
    /// # Arguments
    /// * `xs` - `L` one-hot encoded `B x 47` arrays, one per character.
    ///
    /// # Returns
    /// The logits or `MlErr::EmptySequence` if `xs` is empty.
    pub fn run(&self, xs: &[Array2<f32>]) -> Result<Array2<f32>> {
        let mut graph = Graph::new();
        let (logits, _) = self.forward(&mut graph, xs)?;
        Ok(graph.value(logits)?.to_owned())
    }

    /// The softmax loss of the logits of `xs` against the one-hot languages `y`.
    pub fn get_loss(&self, xs: &[Array2<f32>], y: ArrayView2<f32>) -> Result<f32> {
        self.loss_graph(&xs.to_vec(), y)?.loss()
    }

    /// Trains on batches drawn forever from `dataset` until its validation accuracy reaches
    /// the configured threshold.
    pub fn train<D>(&mut self, dataset: &D, training: &TrainingConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = Vec<Array2<f32>>>,
    {
        training.validate()?;
        let criterion = StopCriterion::ValidationAccuracy(self.config.accuracy_threshold);
        Trainer::from_config(self.config.batch_size, criterion, training).train(self, dataset)
    }
}

impl Classifier<Vec<Array2<f32>>> for LanguageIDModel {
    fn predict(&self, xs: &Vec<Array2<f32>>) -> Result<Vec<usize>> {
        let logits = self.run(xs)?;
        Ok(argmax_rows(logits.view()))
    }
}

impl Learner for LanguageIDModel {
    type Input = Vec<Array2<f32>>;

    fn loss_graph(&self, xs: &Vec<Array2<f32>>, y: ArrayView2<f32>) -> Result<LossGraph> {
        let mut graph = Graph::new();
        let (logits, params) = self.forward(&mut graph, xs)?;
        let y = graph.constant(y.to_owned());
        let loss = graph.softmax_loss(logits, y)?;

        Ok(LossGraph {
            graph,
            loss,
            params,
        })
    }

    /// Expects the gradients of `W_hidden`, `W_hidden2`, `w1`, `b1`, `w2`, `b2`, `w3` and `b3`.
    fn apply(&mut self, gradients: &[Array2<f32>]) -> Result<()> {
        let params = [
            &mut self.w_hidden,
            &mut self.w_hidden2,
            &mut self.w1,
            &mut self.b1,
            &mut self.w2,
            &mut self.b2,
            &mut self.w3,
            &mut self.b3,
        ];
        apply_gradients(params, gradients, self.config.learning_rate)
    }

    fn as_classifier(&self) -> Option<&dyn Classifier<Vec<Array2<f32>>>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, s};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn model() -> LanguageIDModel {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(42)));
        let config = LanguageIdConfig {
            hidden_size: 12,
            ..Default::default()
        };
        LanguageIDModel::new(config, &rng).unwrap()
    }

    fn one_hot(rows: &[usize]) -> Array2<f32> {
        let mut x = Array2::zeros((rows.len(), NUM_CHARS));
        for (row, &c) in rows.iter().enumerate() {
            x[[row, c]] = 1.;
        }
        x
    }

    #[test]
    fn logits_per_language() {
        let xs = vec![one_hot(&[0, 5, 9]), one_hot(&[1, 2, 46])];
        assert_eq!(model().run(&xs).unwrap().dim(), (3, LANGUAGES.len()));
    }

    #[test]
    fn empty_sequences_are_rejected() {
        assert!(matches!(model().run(&[]), Err(MlErr::EmptySequence)));
    }

    #[test]
    fn single_characters_skip_the_recurrence() {
        let model = model();
        let mut shifted = model.clone();

        // Only W_hidden2 moves.
        let mut gradients: Vec<Array2<f32>> = [
            &model.w_hidden,
            &model.w_hidden2,
            &model.w1,
            &model.b1,
            &model.w2,
            &model.b2,
            &model.w3,
            &model.b3,
        ]
        .iter()
        .map(|p| Array2::zeros(p.shape()))
        .collect();
        gradients[1].fill(1.);
        shifted.apply(&gradients).unwrap();

        let one = vec![one_hot(&[3, 17])];
        let two = vec![one_hot(&[3, 17]), one_hot(&[8, 8])];

        assert_eq!(model.run(&one).unwrap(), shifted.run(&one).unwrap());
        assert_ne!(model.run(&two).unwrap(), shifted.run(&two).unwrap());
    }

    #[test]
    fn scores_do_not_depend_on_the_position_in_the_batch() {
        let model = model();
        let xs = vec![one_hot(&[4, 30, 11]), one_hot(&[12, 0, 11])];
        let swapped = vec![one_hot(&[30, 4, 11]), one_hot(&[0, 12, 11])];

        let logits = model.run(&xs).unwrap();
        let swapped_logits = model.run(&swapped).unwrap();

        for (a, b) in [(0, 1), (1, 0), (2, 2)] {
            let diff = &logits.slice(s![a, ..]) - &swapped_logits.slice(s![b, ..]);
            assert!(diff.iter().all(|d| d.abs() < 1e-5));
        }
    }

    #[test]
    fn apply_updates_all_eight_parameters() {
        let mut model = model();
        let before = model.clone();

        let xs = vec![one_hot(&[0, 10]), one_hot(&[20, 30])];
        let y = ndarray::array![[1., 0., 0., 0., 0.], [0., 0., 0., 1., 0.]];
        let loss_graph = model.loss_graph(&xs, y.view()).unwrap();
        let gradients = loss_graph.gradients().unwrap();

        assert_eq!(gradients.len(), 8);
        model.apply(&gradients).unwrap();
        assert_ne!(model.w_hidden2.data(), before.w_hidden2.data());
        assert_ne!(model.w3.data(), before.w3.data());
    }
}
