use std::{fs, path::Path};

use anyhow::{Context, Result};
use machine_learning::config::{
    DigitConfig, LanguageIdConfig, PerceptronConfig, RegressionConfig, TrainingConfig,
};
use serde::{Deserialize, Serialize};

/// Sizes of the synthetic datasets generated for each model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub points: usize,
    pub sine_samples: usize,
    pub digits_per_class: usize,
    pub validation_digits_per_class: usize,
    pub words_per_language: usize,
    pub validation_words_per_language: usize,
    pub max_word_len: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            points: 200,
            sine_samples: 200,
            digits_per_class: 500,
            validation_digits_per_class: 100,
            words_per_language: 400,
            validation_words_per_language: 100,
            max_word_len: 8,
        }
    }
}

/// Everything a run can be configured with, every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub training: TrainingConfig,
    pub data: DataConfig,
    pub perceptron: PerceptronConfig,
    pub regression: RegressionConfig,
    pub digits: DigitConfig,
    pub language_id: LanguageIdConfig,
}

impl RunConfig {
    /// Reads a `RunConfig` from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;

        serde_json::from_str(&content).with_context(|| format!("invalid JSON in '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let config: RunConfig =
            serde_json::from_str(r#"{ "training": { "seed": 3 }, "digits": { "hidden_size": 64 } }"#)
                .unwrap();

        assert_eq!(config.training.seed, Some(3));
        assert_eq!(config.digits.hidden_size, 64);
        assert_eq!(config.regression, RegressionConfig::default());
        assert_eq!(config.data, DataConfig::default());
    }
}
