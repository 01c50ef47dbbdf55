//! Target condition configuration and row filtering
//!
//! The target is the user-chosen binary condition rows are evaluated
//! against: an exact categorical option, or a numeric comparison for
//! continuous columns. Building a [`TargetSpec`] from untyped parts is
//! the configuration boundary; once built, invalid kinds are
//! unrepresentable.

use serde::Serialize;
use thiserror::Error;

use super::bucket::parse_numeric;
use super::dataset::Dataset;

/// Errors raised while assembling the analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown target kind '{0}' (expected 'categorical' or 'continuous')")]
    UnknownTargetKind(String),

    #[error("a categorical target requires a target option")]
    MissingTargetOption,

    #[error("a continuous target requires an operator and a comparison value")]
    MissingTargetComparison,

    #[error("unknown comparison operator '{0}' (expected '=', '>' or '<')")]
    UnknownOperator(String),

    #[error("target column '{0}' not found in dataset")]
    TargetColumnNotFound(String),

    #[error("target column '{0}' is neither categorical nor continuous and was dropped from analysis")]
    TargetColumnUnclassifiable(String),
}

/// Comparison operator for continuous targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
}

impl Operator {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "=" => Ok(Operator::Equal),
            ">" => Ok(Operator::Greater),
            "<" => Ok(Operator::Less),
            other => Err(ConfigError::UnknownOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::Less => "<",
        }
    }
}

/// The binary target condition, tagged by column kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetSpec {
    /// Rows whose target column equals the chosen option exactly.
    Categorical { column: String, option: String },
    /// Rows whose numeric target value compares true against `value`.
    Continuous {
        column: String,
        operator: Operator,
        value: f64,
    },
}

impl TargetSpec {
    /// Assemble a target spec from untyped configuration parts, failing
    /// with an explicit error instead of silently matching no rows.
    pub fn from_parts(
        kind: &str,
        column: &str,
        option: Option<&str>,
        operator: Option<&str>,
        value: Option<f64>,
    ) -> Result<Self, ConfigError> {
        match kind {
            "categorical" => {
                let option = option.ok_or(ConfigError::MissingTargetOption)?;
                Ok(TargetSpec::Categorical {
                    column: column.to_string(),
                    option: option.to_string(),
                })
            }
            "continuous" => {
                let (operator, value) = operator
                    .zip(value)
                    .ok_or(ConfigError::MissingTargetComparison)?;
                Ok(TargetSpec::Continuous {
                    column: column.to_string(),
                    operator: Operator::parse(operator)?,
                    value,
                })
            }
            other => Err(ConfigError::UnknownTargetKind(other.to_string())),
        }
    }

    /// Name of the target column.
    pub fn column(&self) -> &str {
        match self {
            TargetSpec::Categorical { column, .. } => column,
            TargetSpec::Continuous { column, .. } => column,
        }
    }

    /// Human-readable form of the condition, e.g. `outcome = positive`.
    pub fn describe(&self) -> String {
        match self {
            TargetSpec::Categorical { column, option } => format!("{} = {}", column, option),
            TargetSpec::Continuous {
                column,
                operator,
                value,
            } => format!("{} {} {}", column, operator.symbol(), value),
        }
    }

    /// Whether a single raw value of the target column matches.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            TargetSpec::Categorical { option, .. } => raw == option,
            TargetSpec::Continuous {
                operator, value, ..
            } => match parse_numeric(raw) {
                Some(v) => match operator {
                    Operator::Equal => v == *value,
                    Operator::Greater => v > *value,
                    Operator::Less => v < *value,
                },
                None => false,
            },
        }
    }

    /// Per-row match mask against a dataset. Fails when the target column
    /// is absent.
    pub fn row_mask(&self, dataset: &Dataset) -> Result<Vec<bool>, ConfigError> {
        let values = dataset
            .column(self.column())
            .ok_or_else(|| ConfigError::TargetColumnNotFound(self.column().to_string()))?;
        Ok(values.iter().map(|v| self.matches(v)).collect())
    }
}
