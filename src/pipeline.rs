//! Scaling, classification and risk bucketing of encoded vectors.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::classifier::Classifier;
use crate::encoder::{EncodedVector, FeatureEncoder, UnmappedCategoryPolicy};
use crate::error::{Error, Result};
use crate::records::RawInput;
use crate::scaler::Scaler;
use crate::schema::FeatureSchema;

/// Lowest probability classified as moderate risk.
pub const MODERATE_THRESHOLD: f64 = 0.35;
/// Lowest probability classified as high risk.
pub const HIGH_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    /// Buckets a probability: `[0, 0.35)` low, `[0.35, 0.70)` moderate,
    /// `[0.70, 1]` high.
    pub fn from_probability(probability: f64) -> Self {
        if probability < MODERATE_THRESHOLD {
            RiskCategory::Low
        } else if probability < HIGH_THRESHOLD {
            RiskCategory::Moderate
        } else {
            RiskCategory::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW RISK",
            RiskCategory::Moderate => "MODERATE RISK",
            RiskCategory::High => "HIGH RISK",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Classifier decision, `true` when at risk.
    pub label: bool,
    /// Positive-class probability in `[0, 1]`.
    pub probability: f64,
    pub risk: RiskCategory,
}

impl PredictionResult {
    pub fn percentage(&self) -> f64 {
        self.probability * 100.0
    }
}

/// Scales `vector` and runs the classifier on it.
pub fn predict(
    vector: &EncodedVector<'_>,
    scaler: &dyn Scaler,
    classifier: &dyn Classifier,
) -> Result<PredictionResult> {
    if let Some(names) = scaler.feature_names() {
        vector.schema().check_names(names)?;
    }

    let scaled = scaler.transform(vector.as_slice())?;
    debug!("Scaled features: {:?}", scaled);

    let label = classifier.predict(&scaled)?;
    let [_, probability] = classifier.predict_proba(&scaled)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(Error::InvalidProbability(probability));
    }

    let risk = RiskCategory::from_probability(probability);
    debug!("Prediction: label={} probability={:.4} risk={}", label, probability, risk);

    Ok(PredictionResult {
        label,
        probability,
        risk,
    })
}

/// The loaded model: schema, scaler and classifier, shared read-only by
/// every prediction.
#[derive(Debug)]
pub struct ModelContext {
    encoder: FeatureEncoder,
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
}

impl ModelContext {
    pub fn new<S, C>(schema: FeatureSchema, scaler: S, classifier: C) -> Result<Self>
    where
        S: Scaler + 'static,
        C: Classifier + 'static,
    {
        Self::with_policy(schema, scaler, classifier, UnmappedCategoryPolicy::default())
    }

    /// Checks that the artifacts agree on the feature layout.
    pub fn with_policy<S, C>(
        schema: FeatureSchema,
        scaler: S,
        classifier: C,
        policy: UnmappedCategoryPolicy,
    ) -> Result<Self>
    where
        S: Scaler + 'static,
        C: Classifier + 'static,
    {
        if scaler.n_features() != schema.len() {
            return Err(Error::SchemaMismatch {
                expected: schema.len(),
                found: scaler.n_features(),
            });
        }
        if let Some(names) = scaler.feature_names() {
            schema.check_names(names)?;
        }
        if classifier.n_features() != schema.len() {
            return Err(Error::SchemaMismatch {
                expected: schema.len(),
                found: classifier.n_features(),
            });
        }

        Ok(ModelContext {
            encoder: FeatureEncoder::new(schema, policy)?,
            scaler: Box::new(scaler),
            classifier: Box::new(classifier),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Validates, encodes and classifies one patient.
    pub fn assess(&self, raw: &RawInput) -> Result<PredictionResult> {
        raw.validate()?;
        let vector = self.encoder.encode(raw)?;
        debug!("Encoded features: {:?}", vector.as_slice());
        predict(&vector, self.scaler(), self.classifier())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::classifier::{KnnClassifier, LogisticClassifier, Metric, Weights};
    use crate::encoder::encode;
    use crate::records::tests::sample_input;
    use crate::scaler::StandardScaler;
    use crate::schema::tests::{full_schema, FULL_COLUMNS};

    /// Classifier answering a fixed probability.
    #[derive(Debug)]
    struct Fixed {
        width: usize,
        probability: f64,
    }

    impl Classifier for Fixed {
        fn n_features(&self) -> usize {
            self.width
        }

        fn predict(&self, _features: &[f64]) -> Result<bool> {
            Ok(self.probability > 0.5)
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<[f64; 2]> {
            Ok([1.0 - self.probability, self.probability])
        }
    }

    fn identity(width: usize) -> StandardScaler {
        StandardScaler {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
            feature_names: None,
        }
    }

    fn fixed_context(probability: f64) -> ModelContext {
        ModelContext::new(
            full_schema(),
            identity(FULL_COLUMNS.len()),
            Fixed {
                width: FULL_COLUMNS.len(),
                probability,
            },
        )
        .unwrap()
    }

    #[test]
    fn bucket_boundaries_are_exact() {
        assert_eq!(RiskCategory::from_probability(0.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_probability(0.3499), RiskCategory::Low);
        assert_eq!(RiskCategory::from_probability(0.35), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_probability(0.6999), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_probability(0.70), RiskCategory::High);
        assert_eq!(RiskCategory::from_probability(1.0), RiskCategory::High);
    }

    #[test]
    fn probability_of_seventy_percent_is_high_risk() {
        let result = fixed_context(0.70).assess(&sample_input()).unwrap();
        assert_eq!(result.risk, RiskCategory::High);
        assert_eq!(result.risk.to_string(), "HIGH RISK");
        assert!(result.label);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let context = fixed_context(1.5);
        assert!(matches!(
            context.assess(&sample_input()),
            Err(Error::InvalidProbability(p)) if p == 1.5
        ));
        let context = fixed_context(f64::NAN);
        assert!(context.assess(&sample_input()).is_err());
    }

    #[test]
    fn scaler_width_must_match_schema() {
        let result = ModelContext::new(
            full_schema(),
            identity(15),
            Fixed {
                width: 20,
                probability: 0.1,
            },
        );
        assert!(matches!(
            result,
            Err(Error::SchemaMismatch { expected: 20, found: 15 })
        ));
    }

    #[test]
    fn classifier_width_must_match_schema() {
        let result = ModelContext::new(
            full_schema(),
            identity(20),
            LogisticClassifier {
                coefficients: vec![0.0; 19],
                intercept: 0.0,
                threshold: 0.5,
            },
        );
        assert!(matches!(
            result,
            Err(Error::SchemaMismatch { expected: 20, found: 19 })
        ));
    }

    #[test]
    fn scaler_feature_names_must_follow_schema_order() {
        let mut names: Vec<String> = FULL_COLUMNS.iter().map(|name| name.to_string()).collect();
        names.swap(0, 1);
        let scaler = StandardScaler {
            feature_names: Some(names),
            ..identity(20)
        };
        let schema = full_schema();
        let vector = encode(&sample_input(), &schema).unwrap();
        let classifier = Fixed {
            width: 20,
            probability: 0.2,
        };
        assert!(matches!(
            predict(&vector, &scaler, &classifier),
            Err(Error::FeatureNameMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn predict_rejects_short_vector() {
        let schema = FeatureSchema::new(["Age", "MaxHR"]).unwrap();
        let (vector, _) = EncodedVector::align([("Age", 40.0)], &schema);
        let classifier = Fixed {
            width: 3,
            probability: 0.2,
        };
        assert!(matches!(
            predict(&vector, &identity(3), &classifier),
            Err(Error::SchemaMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn invalid_input_is_rejected_before_encoding() {
        let mut raw = sample_input();
        raw.max_hr = 250;
        assert!(matches!(
            fixed_context(0.1).assess(&raw),
            Err(Error::InvalidInput { field: "MaxHR", .. })
        ));
    }

    #[test]
    fn knn_prediction_is_deterministic() {
        let schema = full_schema();
        let reference = encode(&sample_input(), &schema).unwrap().into_values();
        let mut far = reference.clone();
        far[0] += 40.0;
        far[4] -= 60.0;

        let context = ModelContext::new(
            schema,
            identity(20),
            KnnClassifier {
                n_neighbors: 3,
                weights: Weights::Uniform,
                metric: Metric::Euclidean,
                points: vec![reference.clone(), reference, far.clone(), far],
                labels: vec![0, 1, 1, 1],
            },
        )
        .unwrap();

        let first = context.assess(&sample_input()).unwrap();
        let second = context.assess(&sample_input()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.probability.to_bits(), second.probability.to_bits());
        assert!((first.probability - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(first.risk, RiskCategory::Moderate);
        assert!((first.percentage() - 66.666_666_666_666_66).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn bucketing_is_total_and_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(RiskCategory::from_probability(low) <= RiskCategory::from_probability(high));
        }
    }
}
