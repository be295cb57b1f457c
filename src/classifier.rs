use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use smartcore::metrics::distance::{Distance, Distances};

use crate::error::{Error, Result};

/// A fitted binary classifier over scaled feature vectors.
pub trait Classifier: Debug + Send + Sync {
    fn n_features(&self) -> usize;

    /// `true` for the positive (at risk) class.
    fn predict(&self, features: &[f64]) -> Result<bool>;

    /// Class membership probabilities as `[negative, positive]`.
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weights {
    #[default]
    Uniform,
    /// Neighbours vote with the inverse of their distance.
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
    Minkowski { p: u16 },
}

impl Metric {
    fn distance(&self, a: &Vec<f64>, b: &Vec<f64>) -> f64 {
        match *self {
            Metric::Euclidean => Distances::euclidian::<f64>().distance(a, b),
            Metric::Manhattan => Distances::manhattan::<f64>().distance(a, b),
            Metric::Minkowski { p } => Distances::minkowski::<f64>(p).distance(a, b),
        }
    }
}

/// k-nearest-neighbours over the stored training points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    pub n_neighbors: usize,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub metric: Metric,
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl KnnClassifier {
    pub fn validate(&self) -> Result<()> {
        let width = match self.points.first() {
            Some(point) if !point.is_empty() => point.len(),
            _ => return Err(invalid("no training points".to_string())),
        };
        if let Some(row) = self.points.iter().position(|point| point.len() != width) {
            return Err(invalid(format!("point {} has a different width", row)));
        }
        if self.points.iter().flatten().any(|value| !value.is_finite()) {
            return Err(invalid("non-finite training point".to_string()));
        }
        if self.labels.len() != self.points.len() {
            return Err(invalid(format!(
                "{} labels for {} points",
                self.labels.len(),
                self.points.len()
            )));
        }
        if let Some(label) = self.labels.iter().find(|&&label| label > 1) {
            return Err(invalid(format!("label {} is not binary", label)));
        }
        if self.n_neighbors == 0 || self.n_neighbors > self.points.len() {
            return Err(invalid(format!(
                "n_neighbors {} outside 1..={}",
                self.n_neighbors,
                self.points.len()
            )));
        }
        if let Metric::Minkowski { p: 0 } = self.metric {
            return Err(invalid("minkowski p must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Distances and labels of the `n_neighbors` closest points, nearest first.
    fn neighbours(&self, features: &[f64]) -> Result<Vec<(f64, u8)>> {
        check_width(self.n_features(), features)?;
        let query = features.to_vec();
        let mut scored: Vec<(f64, u8)> = self
            .points
            .iter()
            .zip(&self.labels)
            .map(|(point, &label)| (self.metric.distance(&query, point), label))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(self.n_neighbors);
        Ok(scored)
    }
}

impl Classifier for KnnClassifier {
    fn n_features(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    fn predict(&self, features: &[f64]) -> Result<bool> {
        let [negative, positive] = self.predict_proba(features)?;
        Ok(positive > negative)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        let neighbours = self.neighbours(features)?;

        let exact = neighbours.iter().any(|(distance, _)| *distance == 0.0);
        let mut votes = [0.0; 2];
        for (distance, label) in neighbours {
            let weight = match self.weights {
                Weights::Uniform => 1.0,
                // exact matches take all of the weight
                Weights::Distance if exact => {
                    if distance == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                Weights::Distance => 1.0 / distance,
            };
            votes[usize::from(label)] += weight;
        }

        let total = votes[0] + votes[1];
        Ok([votes[0] / total, votes[1] / total])
    }
}

/// Logistic regression: `sigmoid(coefficients · x + intercept)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Positive label only when the probability is strictly above this.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticClassifier {
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(invalid("no coefficients".to_string()));
        }
        if self
            .coefficients
            .iter()
            .chain([&self.intercept])
            .any(|value| !value.is_finite())
        {
            return Err(invalid("non-finite coefficient".to_string()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid(format!("threshold {} outside [0, 1]", self.threshold)));
        }
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<bool> {
        let [_, positive] = self.predict_proba(features)?;
        Ok(positive > self.threshold)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        check_width(self.n_features(), features)?;
        let z: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        let positive = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - positive, positive])
    }
}

/// Classifier as stored in `classifier.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Knn(KnnClassifier),
    Logistic(LogisticClassifier),
}

impl ClassifierArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierArtifact::Knn(_) => "knn",
            ClassifierArtifact::Logistic(_) => "logistic",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierArtifact::Knn(model) => model.validate(),
            ClassifierArtifact::Logistic(model) => model.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierArtifact::Knn(model) => model,
            ClassifierArtifact::Logistic(model) => model,
        }
    }
}

impl Classifier for ClassifierArtifact {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict(&self, features: &[f64]) -> Result<bool> {
        self.inner().predict(features)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        self.inner().predict_proba(features)
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<()> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(Error::SchemaMismatch {
            expected,
            found: features.len(),
        })
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidArtifact {
        artifact: "classifier",
        reason,
    }
}
