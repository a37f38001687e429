use std::{cell::RefCell, rc::Rc};

use machine_learning::{
    MlErr,
    config::{DigitConfig, LanguageIdConfig, RegressionConfig, TrainingConfig},
    dataset::{Dataset, TabularDataset, synthetic},
    models::{DigitClassificationModel, LanguageIDModel, PerceptronModel, RegressionModel},
};
use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};

fn shared_rng(seed: u64) -> Rc<RefCell<StdRng>> {
    Rc::new(RefCell::new(StdRng::seed_from_u64(seed)))
}

fn training(seed: u64, max_steps: usize) -> TrainingConfig {
    TrainingConfig {
        seed: Some(seed),
        max_steps: Some(max_steps),
    }
}

#[test]
fn perceptron_separates_linearly_separable_points() {
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = synthetic::separable_points(&mut rng, 100, 3).unwrap();
    let mut model = PerceptronModel::new(3, &shared_rng(1)).unwrap();

    let report = model.train(&dataset).unwrap();
    assert!(report.steps >= 1);

    for batch in dataset.iterate_once(1).unwrap() {
        let prediction = model.get_prediction(batch.x.view()).unwrap();
        assert_eq!(f32::from(prediction), batch.y[[0, 0]]);
    }
}

#[test]
fn regression_fits_a_sine_wave() {
    let dataset = synthetic::sine(200).unwrap();
    // The default step size needs around 30k steps, it is covered by the ignored test below.
    let config = RegressionConfig {
        learning_rate: -0.02,
        ..Default::default()
    };
    let mut model = RegressionModel::new(config, &shared_rng(2)).unwrap();

    let report = model.train(&dataset, &training(2, 100_000)).unwrap();

    let loss = report.last_loss.unwrap();
    assert!(loss < 0.02);

    // The whole dataset is a single batch.
    let full = model.get_loss(dataset.x().view(), dataset.y().view()).unwrap();
    assert!(full < 0.05);
}

#[test]
#[ignore = "around 30k steps, run with --release --ignored"]
fn regression_fits_a_sine_wave_with_the_default_hyperparameters() {
    let dataset = synthetic::sine(200).unwrap();
    let mut model = RegressionModel::new(RegressionConfig::default(), &shared_rng(1)).unwrap();

    let report = model.train(&dataset, &training(1, 200_000)).unwrap();
    assert!(report.last_loss.unwrap() < 0.02);
}

#[test]
fn regression_maps_every_batch_size() {
    let model = RegressionModel::new(RegressionConfig::default(), &shared_rng(3)).unwrap();

    for batch_size in [1, 2, 50, 200, 333] {
        let x = Array2::from_elem((batch_size, 1), 0.5);
        assert_eq!(model.run(x.view()).unwrap().dim(), (batch_size, 1));
    }
}

#[test]
fn digit_classifier_reaches_its_validation_accuracy() {
    let mut rng = StdRng::seed_from_u64(4);
    let dataset = synthetic::digits(&mut rng, 50, 20).unwrap();
    let config = DigitConfig {
        hidden_size: 32,
        ..Default::default()
    };
    let mut model = DigitClassificationModel::new(config, &shared_rng(4)).unwrap();

    let report = model.train(&dataset, &training(4, 3_000)).unwrap();

    assert!(report.last_accuracy.unwrap() >= 0.978);
    assert!(dataset.validation_accuracy(&model).unwrap() >= 0.978);
}

#[test]
fn digit_classifier_needs_a_validation_split() {
    let mut rng = StdRng::seed_from_u64(5);
    let digits = synthetic::digits(&mut rng, 2, 1).unwrap();
    let dataset = TabularDataset::new(digits.x().clone(), digits.y().clone()).unwrap();
    let mut model = DigitClassificationModel::new(DigitConfig::default(), &shared_rng(5)).unwrap();

    let err = model.train(&dataset, &training(5, 10)).unwrap_err();
    assert!(matches!(err, MlErr::NoValidationSplit));
}

#[test]
fn language_identifier_beats_chance() {
    let mut rng = StdRng::seed_from_u64(6);
    let dataset = synthetic::languages(&mut rng, 60, 30, 4).unwrap();
    let config = LanguageIdConfig {
        hidden_size: 32,
        accuracy_threshold: 0.6,
        ..Default::default()
    };
    let mut model = LanguageIDModel::new(config, &shared_rng(6)).unwrap();

    let report = model.train(&dataset, &training(6, 3_000)).unwrap();

    assert!(report.last_accuracy.unwrap() >= 0.6);
    assert!(dataset.validation_accuracy(&model).unwrap() >= 0.6);
}

#[test]
fn invalid_configs_are_rejected_before_training() {
    let config = LanguageIdConfig {
        learning_rate: 0.05,
        ..Default::default()
    };

    let err = LanguageIDModel::new(config, &shared_rng(7)).unwrap_err();
    assert!(matches!(err, MlErr::InvalidConfig(_)));
}
