//! Entity-keyed observation series.
//!
//! Every auxiliary series (previous-period values, CUPED covariate,
//! additional regression variables) must be addressable by the same keys
//! as the primary variable, so resampled control/treatment groups stay
//! row-aligned across all series.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::SimulationError;

/// A named series of `f64` observations keyed by entity id.
///
/// Keys are unique; lookups by key are O(1). The simulation engine never
/// mutates a caller's series when injecting an effect, it works on sampled
/// copies. Deserialization rebuilds the key index, so a series keeps its
/// lookups after a serde round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SeriesData")]
pub struct Series {
    name: String,
    keys: Vec<i64>,
    values: Vec<f64>,
    #[serde(skip)]
    index: HashMap<i64, usize>,
}

/// Wire shape of a [`Series`]; conversion re-runs the keyed construction
/// path so the index and the key invariants hold after deserialization.
#[derive(Deserialize)]
struct SeriesData {
    name: String,
    keys: Vec<i64>,
    values: Vec<f64>,
}

impl TryFrom<SeriesData> for Series {
    type Error = SimulationError;

    fn try_from(data: SeriesData) -> Result<Self, Self::Error> {
        if data.keys.len() != data.values.len() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "series '{}' has {} keys but {} values",
                data.name,
                data.keys.len(),
                data.values.len()
            )));
        }
        Series::new(data.name, data.keys.into_iter().zip(data.values))
    }
}

impl Series {
    /// Build a series from (key, value) pairs. Duplicate keys are a
    /// configuration error.
    pub fn new(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (i64, f64)>,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut index = HashMap::new();

        for (key, value) in pairs {
            if index.insert(key, keys.len()).is_some() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "series '{name}' has duplicate key {key}"
                )));
            }
            keys.push(key);
            values.push(value);
        }

        Ok(Self {
            name,
            keys,
            values,
            index,
        })
    }

    /// Build a series from plain values, keyed sequentially from 0.
    pub fn from_values(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let name = name.into();
        let values: Vec<f64> = values.into_iter().collect();
        let keys: Vec<i64> = (0..values.len() as i64).collect();
        let index = keys.iter().map(|&k| (k, k as usize)).collect();

        Self {
            name,
            keys,
            values,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value for a key, if the series covers it.
    pub fn get(&self, key: i64) -> Option<f64> {
        self.index.get(&key).map(|&pos| self.values[pos])
    }

    /// Values for a set of drawn keys, in draw order. A key the series
    /// does not cover breaks row alignment and is an error.
    pub fn values_at(&self, keys: &[i64]) -> Result<Vec<f64>, SimulationError> {
        keys.iter()
            .map(|&key| {
                self.get(key).ok_or(SimulationError::MissingKey {
                    series: self.name.clone(),
                    key,
                })
            })
            .collect()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample variance (n - 1 denominator).
    pub fn sample_var(&self) -> f64 {
        sample_var(&self.values)
    }

    pub fn std(&self) -> f64 {
        self.sample_var().sqrt()
    }
}

/// Sample variance of a slice (n - 1 denominator).
pub(crate) fn sample_var(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample covariance of two equally long slices (n - 1 denominator).
pub(crate) fn sample_cov(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }
    let mean_a = a.iter().sum::<f64>() / a.len() as f64;
    let mean_b = b.iter().sum::<f64>() / b.len() as f64;
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / (a.len() - 1) as f64
}

/// Mean of a slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_sequential_keys() {
        let s = Series::from_values("v", [1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.keys(), &[0, 1, 2]);
        assert_eq!(s.get(2), Some(3.0));
        assert_eq!(s.get(3), None);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = Series::new("v", [(1, 1.0), (1, 2.0)]);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_values_at_preserves_draw_order() {
        let s = Series::new("v", [(10, 1.0), (20, 2.0), (30, 3.0)]).unwrap();
        let values = s.values_at(&[30, 10, 30]).unwrap();
        assert_eq!(values, vec![3.0, 1.0, 3.0]);
    }

    #[test]
    fn test_values_at_missing_key() {
        let s = Series::new("prev", [(1, 1.0)]).unwrap();
        let err = s.values_at(&[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MissingKey { key: 2, .. }
        ));
    }

    #[test]
    fn test_deserialized_series_keeps_lookups() {
        let original = Series::from_values("v", [1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&original).unwrap();
        let back: Series = serde_json::from_str(&json).unwrap();

        assert_eq!(back.get(1), Some(2.0));
        assert_eq!(back.values_at(&[2, 0]).unwrap(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_deserialize_rejects_corrupt_payloads() {
        // Duplicate keys and key/value length mismatches fail the same
        // validation as direct construction.
        let dup = r#"{"name":"v","keys":[1,1],"values":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<Series>(dup).is_err());

        let ragged = r#"{"name":"v","keys":[1,2,3],"values":[1.0]}"#;
        assert!(serde_json::from_str::<Series>(ragged).is_err());
    }

    #[test]
    fn test_moments() {
        let s = Series::from_values("v", [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s.mean() - 5.0).abs() < 1e-12);
        // Sample variance with n - 1 denominator.
        assert!((s.sample_var() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_cov_matches_var() {
        let v = [1.0, 3.0, 5.0, 9.0];
        assert!((sample_cov(&v, &v) - sample_var(&v)).abs() < 1e-12);
    }
}
