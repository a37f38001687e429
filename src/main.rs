mod config;

use std::{cell::RefCell, env, path::Path, process, rc::Rc};

use anyhow::{Context, Result, bail};
use log::info;
use machine_learning::{
    dataset::{Dataset, synthetic},
    models::{
        DigitClassificationModel, LANGUAGES, LanguageIDModel, PerceptronModel, RegressionModel,
    },
    training::{TrainReport, generate_rng},
};

use config::RunConfig;

const MODELS: &str = "perceptron|regression|digits|language";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <{MODELS}> [config.json]", args[0]);
        process::exit(1);
    }

    let config = match args.get(2) {
        Some(path) => RunConfig::load(Path::new(path))?,
        None => RunConfig::default(),
    };
    config.training.validate().context("invalid training config")?;

    let report = match args[1].as_str() {
        "perceptron" => perceptron(&config)?,
        "regression" => regression(&config)?,
        "digits" => digits(&config)?,
        "language" => language(&config)?,
        other => bail!("unknown model '{other}', expected one of {MODELS}"),
    };

    info!(
        steps = report.steps,
        updates = report.updates,
        last_loss:? = report.last_loss,
        last_accuracy:? = report.last_accuracy;
        "{} trained", args[1]
    );
    println!("{report:?}");
    Ok(())
}

fn perceptron(config: &RunConfig) -> Result<TrainReport> {
    let rng = Rc::new(RefCell::new(generate_rng(config.training.seed)));
    let dataset = synthetic::separable_points(
        &mut *rng.borrow_mut(),
        config.data.points,
        config.perceptron.dimensions,
    )?;

    let mut model = PerceptronModel::from_config(&config.perceptron, &rng)?;
    let report = model.train(&dataset)?;
    info!(weights:? = model.get_weights().data(); "perceptron weights");
    Ok(report)
}

fn regression(config: &RunConfig) -> Result<TrainReport> {
    let dataset = synthetic::sine(config.data.sine_samples)?;
    let rng = Rc::new(RefCell::new(generate_rng(config.training.seed)));

    let mut model = RegressionModel::new(config.regression, &rng)?;
    let report = model.train(&dataset, &config.training)?;

    let loss = model.get_loss(dataset.x().view(), dataset.y().view())?;
    info!(loss = loss; "regression loss over the whole dataset");
    Ok(report)
}

fn digits(config: &RunConfig) -> Result<TrainReport> {
    let rng = Rc::new(RefCell::new(generate_rng(config.training.seed)));
    let dataset = synthetic::digits(
        &mut *rng.borrow_mut(),
        config.data.digits_per_class,
        config.data.validation_digits_per_class,
    )?;

    let mut model = DigitClassificationModel::new(config.digits, &rng)?;
    let report = model.train(&dataset, &config.training)?;

    let accuracy = dataset.validation_accuracy(&model)?;
    info!(accuracy = accuracy; "digit validation accuracy");
    Ok(report)
}

fn language(config: &RunConfig) -> Result<TrainReport> {
    let rng = Rc::new(RefCell::new(generate_rng(config.training.seed)));
    let dataset = synthetic::languages(
        &mut *rng.borrow_mut(),
        config.data.words_per_language,
        config.data.validation_words_per_language,
        config.data.max_word_len,
    )?;

    let mut model = LanguageIDModel::new(config.language_id, &rng)?;
    let report = model.train(&dataset, &config.training)?;

    let accuracy = dataset.validation_accuracy(&model)?;
    info!(accuracy = accuracy, languages = LANGUAGES.len(); "language validation accuracy");
    Ok(report)
}
