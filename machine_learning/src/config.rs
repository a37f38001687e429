use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Bounds and seeding shared by every training loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Seed for both initialization and batch sampling, entropy is used when missing.
    pub seed: Option<u64>,
    /// Training fails with `MlErr::NotConverged` after this many steps, unbounded when missing.
    pub max_steps: Option<usize>,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == Some(0) {
            return invalid("max_steps must be positive");
        }

        Ok(())
    }
}

/// Hyperparameters of the `PerceptronModel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerceptronConfig {
    pub dimensions: usize,
    /// Maximum amount of passes over the dataset, unbounded when missing.
    pub max_epochs: Option<usize>,
}

impl Default for PerceptronConfig {
    fn default() -> Self {
        Self {
            dimensions: 3,
            max_epochs: None,
        }
    }
}

impl PerceptronConfig {
    pub fn validate(&self) -> Result<()> {
        positive("dimensions", self.dimensions)?;
        if self.max_epochs == Some(0) {
            return invalid("max_epochs must be positive");
        }

        Ok(())
    }
}

/// Hyperparameters of the `RegressionModel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Training stops on the first batch whose loss is strictly below this value.
    pub loss_threshold: f32,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            hidden_size: 50,
            batch_size: 200,
            learning_rate: -0.005,
            loss_threshold: 0.02,
        }
    }
}

impl RegressionConfig {
    pub fn validate(&self) -> Result<()> {
        positive("hidden_size", self.hidden_size)?;
        positive("batch_size", self.batch_size)?;
        descending(self.learning_rate)?;
        if !(self.loss_threshold > 0.) {
            return invalid(format!(
                "loss_threshold must be positive, got {}",
                self.loss_threshold
            ));
        }

        Ok(())
    }
}

/// Hyperparameters of the `DigitClassificationModel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DigitConfig {
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Training stops once the validation accuracy reaches this value.
    pub accuracy_threshold: f32,
}

impl Default for DigitConfig {
    fn default() -> Self {
        Self {
            hidden_size: 100,
            batch_size: 20,
            learning_rate: -0.05,
            accuracy_threshold: 0.978,
        }
    }
}

impl DigitConfig {
    pub fn validate(&self) -> Result<()> {
        positive("hidden_size", self.hidden_size)?;
        positive("batch_size", self.batch_size)?;
        descending(self.learning_rate)?;
        fraction(self.accuracy_threshold)
    }
}

/// Hyperparameters of the `LanguageIDModel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageIdConfig {
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Training stops once the validation accuracy reaches this value.
    pub accuracy_threshold: f32,
}

impl Default for LanguageIdConfig {
    fn default() -> Self {
        Self {
            hidden_size: 250,
            batch_size: 40,
            learning_rate: -0.05,
            accuracy_threshold: 0.86,
        }
    }
}

impl LanguageIdConfig {
    pub fn validate(&self) -> Result<()> {
        positive("hidden_size", self.hidden_size)?;
        positive("batch_size", self.batch_size)?;
        descending(self.learning_rate)?;
        fraction(self.accuracy_threshold)
    }
}

fn invalid(reason: impl Into<String>) -> Result<()> {
    Err(MlErr::InvalidConfig(reason.into()))
}

fn positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return invalid(format!("{name} must be positive"));
    }

    Ok(())
}

// Parameters move by `learning_rate * gradient`, so it must be negative to descend.
fn descending(learning_rate: f32) -> Result<()> {
    if !(learning_rate < 0.) {
        return invalid(format!(
            "learning_rate must be negative, got {learning_rate}"
        ));
    }

    Ok(())
}

fn fraction(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return invalid(format!(
            "accuracy_threshold must be within [0, 1], got {threshold}"
        ));
    }

    Ok(())
}
