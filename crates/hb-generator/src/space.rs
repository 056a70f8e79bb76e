//! Hyper-parameter distributions and seeded sampling.

use std::collections::BTreeMap;
use std::path::Path;

use hb_types::{GenerationError, HbResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How one hyper-parameter is drawn.
///
/// In a space file the variant is the `type` field:
/// `{"name": "lr", "type": "log_uniform", "low": 1e-5, "high": 0.1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Uniform over `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// Uniform over the integers `low..=high`.
    IntUniform { low: i64, high: i64 },
    /// Uniform in `ln` space, for scale-like parameters.
    LogUniform { low: f64, high: f64 },
    Categorical { choices: Vec<Value> },
}

impl Distribution {
    fn check(&self) -> Result<(), String> {
        match self {
            Self::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite() && low <= high) {
                    return Err(format!("bad range [{low}, {high}]"));
                }
                if !(high - low).is_finite() {
                    return Err(format!("range [{low}, {high}] is too wide to sample"));
                }
            }
            Self::IntUniform { low, high } => {
                if low > high {
                    return Err(format!("bad range [{low}, {high}]"));
                }
            }
            Self::LogUniform { low, high } => {
                if !(*low > 0.0 && high.is_finite() && low <= high) {
                    return Err(format!(
                        "log-uniform bounds must be positive, got [{low}, {high}]"
                    ));
                }
                if !(high.ln() - low.ln()).is_finite() {
                    return Err(format!("log-uniform range [{low}, {high}] is too wide to sample"));
                }
            }
            Self::Categorical { choices } => {
                if choices.is_empty() {
                    return Err("no choices given".to_string());
                }
            }
        }
        Ok(())
    }

    /// Number of distinct values, `None` when continuous.
    fn size(&self) -> Option<u64> {
        match self {
            Self::IntUniform { low, high } => high.abs_diff(*low).checked_add(1),
            Self::Categorical { choices } => Some(choices.len() as u64),
            Self::Uniform { .. } | Self::LogUniform { .. } => None,
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            Self::Uniform { low, high } => {
                let value: f64 = rng.gen_range(*low..=*high);
                json!(value)
            }
            Self::IntUniform { low, high } => {
                let value: i64 = rng.gen_range(*low..=*high);
                json!(value)
            }
            Self::LogUniform { low, high } => {
                let exponent: f64 = rng.gen_range(low.ln()..=high.ln());
                json!(exponent.exp())
            }
            Self::Categorical { choices } => choices[rng.gen_range(0..choices.len())].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameter {
    /// Key of the value in rendered configurations.
    pub name: String,
    #[serde(flatten)]
    pub distribution: Distribution,
}

/// Sampled values keyed by parameter name. Sorted, so rendering never
/// depends on hash iteration order.
pub type Assignment = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<Hyperparameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Space used when the operator does not provide one.
    pub fn builtin() -> Self {
        Self::new()
            .with(
                "learning_rate",
                Distribution::LogUniform {
                    low: 1e-5,
                    high: 1e-1,
                },
            )
            .with(
                "batch_size",
                Distribution::Categorical {
                    choices: vec![json!(16), json!(32), json!(64), json!(128)],
                },
            )
            .with("hidden_layers", Distribution::IntUniform { low: 1, high: 4 })
            .with("dropout", Distribution::Uniform { low: 0.0, high: 0.5 })
    }

    /// Load and validate a `{"parameters": [...]}` document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> HbResult<Self> {
        let space: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        space.validate()?;
        Ok(space)
    }

    pub fn with(mut self, name: impl Into<String>, distribution: Distribution) -> Self {
        self.parameters.push(Hyperparameter {
            name: name.into(),
            distribution,
        });
        self
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.parameters.is_empty() {
            return Err(GenerationError::InvalidSpace {
                message: "no parameters defined".to_string(),
            });
        }
        for param in &self.parameters {
            param
                .distribution
                .check()
                .map_err(|reason| GenerationError::InvalidSpace {
                    message: format!("{}: {reason}", param.name),
                })?;
        }
        Ok(())
    }

    /// Number of distinct assignments, `None` if any parameter is continuous
    /// or the product overflows.
    pub fn cardinality(&self) -> Option<u64> {
        self.parameters
            .iter()
            .try_fold(1u64, |total, param| total.checked_mul(param.distribution.size()?))
    }

    /// Draw every parameter once, in declaration order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Assignment {
        self.parameters
            .iter()
            .map(|param| (param.name.clone(), param.distribution.draw(&mut *rng)))
            .collect()
    }
}
