//! Hyperparameter values and the per-instance parameter table

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key under which every loss stores its negative-sample count
pub const ETA: &str = "eta";

/// Class parameter: whether positives and negatives must have the same length
pub const REQUIRE_SAME_SIZE_POS_NEG: &str = "require_same_size_pos_neg";

/// A single hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Explicitly switched off (`null` in config files)
    Disabled,
}

/// Hyperparameters as supplied by the caller
pub type HyperParams = HashMap<String, ParamValue>;

impl ParamValue {
    /// Numeric view; integers widen to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integer view
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    /// Whether the value is `Disabled`
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Disabled => write!(f, "None"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Option<f64>> for ParamValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Disabled, Self::Float)
    }
}

/// Read an optional float hyperparameter, falling back to `default` when absent
pub fn float_or(hyperparams: &HyperParams, key: &str, default: f64) -> Result<ParamValue> {
    match hyperparams.get(key) {
        None => Ok(ParamValue::Float(default)),
        Some(value) => value
            .as_f64()
            .map(ParamValue::Float)
            .ok_or_else(|| type_error(key, "a number", value)),
    }
}

/// Read a float hyperparameter that may be switched off with `Disabled`
pub fn optional_float_or(
    hyperparams: &HyperParams,
    key: &str,
    default: Option<f64>,
) -> Result<ParamValue> {
    match hyperparams.get(key) {
        None => Ok(default.into()),
        Some(ParamValue::Disabled) => Ok(ParamValue::Disabled),
        Some(value) => value
            .as_f64()
            .map(ParamValue::Float)
            .ok_or_else(|| type_error(key, "a number or null", value)),
    }
}

/// Read a boolean hyperparameter, falling back to `default` when absent
pub fn bool_or(hyperparams: &HyperParams, key: &str, default: bool) -> Result<ParamValue> {
    match hyperparams.get(key) {
        None => Ok(ParamValue::Bool(default)),
        Some(value) => value
            .as_bool()
            .map(ParamValue::Bool)
            .ok_or_else(|| type_error(key, "a bool", value)),
    }
}

fn type_error(key: &str, expected: &str, value: &ParamValue) -> Error {
    Error::invalid_hyperparameter(
        key,
        format!("expected {}, got {} ({})", expected, value.kind(), value),
    )
}

/// Resolved hyperparameters held by a loss instance.
///
/// Always contains [`ETA`]. Lookups fail with
/// [`Error::MissingHyperparameter`] naming the loss and key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossParameters {
    #[serde(skip)]
    loss: String,
    values: BTreeMap<String, ParamValue>,
}

impl LossParameters {
    pub(crate) fn new(loss: impl Into<String>, eta: usize) -> Self {
        let mut values = BTreeMap::new();
        values.insert(ETA.to_string(), ParamValue::from(eta));
        Self {
            loss: loss.into(),
            values,
        }
    }

    /// Store a value, returning the previous one if any
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(key.into(), value)
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Whether `key` has been set
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Negative-sample count.
    ///
    /// Integral floats (e.g. `2.0` bound through `set_hyperparam`) are accepted;
    /// anything else that is not a count of at least 1 is rejected.
    pub fn eta(&self) -> Result<usize> {
        let value = self.require(ETA)?;
        let eta = match *value {
            ParamValue::Int(v) if v >= 1 => Some(v as usize),
            ParamValue::Float(v) if v >= 1.0 && v.fract() == 0.0 && v <= usize::MAX as f64 => Some(v as usize),
            _ => None,
        };
        eta.ok_or_else(|| type_error(ETA, "a positive integer", value))
    }

    fn require(&self, key: &str) -> Result<&ParamValue> {
        self.values
            .get(key)
            .ok_or_else(|| Error::missing_hyperparameter(&self.loss, key))
    }

    /// Required numeric value
    pub fn float(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| type_error(key, "a number", value))
    }

    /// Required numeric value that may be `Disabled`
    pub fn optional_float(&self, key: &str) -> Result<Option<f64>> {
        match self.require(key)? {
            ParamValue::Disabled => Ok(None),
            value => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| type_error(key, "a number or null", value)),
        }
    }

    /// Required boolean value
    pub fn boolean(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| type_error(key, "a bool", value))
    }

    /// Required positive count, e.g. `num_entities`
    pub fn count(&self, key: &str) -> Result<usize> {
        let value = self.require(key)?;
        match value.as_usize() {
            Some(n) if n > 0 => Ok(n),
            _ => Err(type_error(key, "a positive integer", value)),
        }
    }
}

/// Per-variant behavioural flags, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassParams {
    /// Positives and negatives must have equal length whenever `eta != 1`
    pub require_same_size_pos_neg: bool,
}

impl Default for ClassParams {
    fn default() -> Self {
        Self {
            require_same_size_pos_neg: true,
        }
    }
}

impl ClassParams {
    /// Flags for losses that take `eta` negatives per positive
    pub fn unequal_sizes() -> Self {
        Self {
            require_same_size_pos_neg: false,
        }
    }

    /// Look up a flag by name
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        match name {
            REQUIRE_SAME_SIZE_POS_NEG => Some(ParamValue::Bool(self.require_same_size_pos_neg)),
            _ => None,
        }
    }
}
