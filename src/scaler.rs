use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fitted, column-positional feature transform.
pub trait Scaler: Debug + Send + Sync {
    /// Width of the vectors the scaler was fitted on.
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when the artifact recorded them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Min-max normalization: `(x - data_min) / (data_max - data_min)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Scaler as stored in `scaler.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl StandardScaler {
    pub fn validate(&self) -> Result<()> {
        check_params(&self.mean, &self.scale, self.feature_names.as_deref())
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        shift_and_divide(features, &self.mean, self.scale.iter().copied())
    }
}

impl MinMaxScaler {
    pub fn validate(&self) -> Result<()> {
        check_params(&self.data_min, &self.data_max, self.feature_names.as_deref())?;
        match self.data_min.iter().zip(&self.data_max).position(|(min, max)| min > max) {
            Some(column) => Err(invalid(format!("data_min exceeds data_max at column {}", column))),
            None => Ok(()),
        }
    }
}

impl Scaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        let ranges = self
            .data_min
            .iter()
            .zip(&self.data_max)
            .map(|(min, max)| max - min);
        shift_and_divide(features, &self.data_min, ranges)
    }
}

impl ScalerArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ScalerArtifact::Standard(_) => "standard",
            ScalerArtifact::MinMax(_) => "min_max",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ScalerArtifact::Standard(scaler) => scaler.validate(),
            ScalerArtifact::MinMax(scaler) => scaler.validate(),
        }
    }

    fn inner(&self) -> &dyn Scaler {
        match self {
            ScalerArtifact::Standard(scaler) => scaler,
            ScalerArtifact::MinMax(scaler) => scaler,
        }
    }
}

impl Scaler for ScalerArtifact {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.inner().feature_names()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.inner().transform(features)
    }
}

fn shift_and_divide<I>(features: &[f64], offsets: &[f64], divisors: I) -> Result<Vec<f64>>
where
    I: Iterator<Item = f64>,
{
    if features.len() != offsets.len() {
        return Err(Error::SchemaMismatch {
            expected: offsets.len(),
            found: features.len(),
        });
    }

    // constant columns were fitted with a zero spread; leave them unscaled
    Ok(features
        .iter()
        .zip(offsets)
        .zip(divisors)
        .map(|((x, offset), divisor)| {
            let divisor = if divisor == 0.0 { 1.0 } else { divisor };
            (x - offset) / divisor
        })
        .collect())
}

fn check_params(first: &[f64], second: &[f64], names: Option<&[String]>) -> Result<()> {
    if first.is_empty() {
        return Err(invalid("no columns".to_string()));
    }
    if first.len() != second.len() {
        return Err(invalid(format!(
            "parameter lengths differ ({} vs {})",
            first.len(),
            second.len()
        )));
    }
    if first.iter().chain(second).any(|value| !value.is_finite()) {
        return Err(invalid("non-finite parameter".to_string()));
    }
    if let Some(names) = names {
        if names.len() != first.len() {
            return Err(invalid(format!(
                "{} feature names for {} columns",
                names.len(),
                first.len()
            )));
        }
    }
    Ok(())
}

fn invalid(reason: String) -> Error {
    Error::InvalidArtifact {
        artifact: "scaler",
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> StandardScaler {
        StandardScaler {
            mean: vec![50.0, 130.0, 0.5],
            scale: vec![10.0, 20.0, 0.0],
            feature_names: None,
        }
    }

    #[test]
    fn standard_scaler_centers_and_scales() {
        let scaled = standard().transform(&[60.0, 110.0, 1.0]).unwrap();
        assert_eq!(scaled, vec![1.0, -1.0, 0.5]);
    }

    #[test]
    fn min_max_scaler_maps_range_to_unit_interval() {
        let scaler = MinMaxScaler {
            data_min: vec![18.0, 0.0],
            data_max: vec![100.0, 0.0],
            feature_names: None,
        };
        assert_eq!(scaler.transform(&[18.0, 3.0]).unwrap(), vec![0.0, 3.0]);
        assert_eq!(scaler.transform(&[100.0, 0.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn width_mismatch_is_schema_mismatch() {
        assert!(matches!(
            standard().transform(&[1.0, 2.0]),
            Err(Error::SchemaMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn artifact_is_tagged_by_kind() {
        let json = r#"{"kind": "standard", "mean": [1.0], "scale": [2.0], "feature_names": ["Age"]}"#;
        let artifact: ScalerArtifact = serde_json::from_str(json).unwrap();
        assert!(artifact.validate().is_ok());
        assert_eq!(artifact.n_features(), 1);
        assert_eq!(artifact.feature_names(), Some(&["Age".to_string()][..]));
        assert_eq!(artifact.transform(&[5.0]).unwrap(), vec![2.0]);

        let json = r#"{"kind": "min_max", "data_min": [0.0], "data_max": [4.0]}"#;
        let artifact: ScalerArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.transform(&[1.0]).unwrap(), vec![0.25]);
    }

    #[test]
    fn validate_rejects_inconsistent_parameters() {
        let mut scaler = standard();
        scaler.scale.pop();
        assert!(scaler.validate().is_err());

        let mut scaler = standard();
        scaler.feature_names = Some(vec!["Age".to_string()]);
        assert!(scaler.validate().is_err());

        let scaler = MinMaxScaler {
            data_min: vec![2.0],
            data_max: vec![1.0],
            feature_names: None,
        };
        assert!(scaler.validate().is_err());
    }
}
