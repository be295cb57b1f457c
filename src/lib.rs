//! Heart stroke risk scoring from a handful of clinical risk factors.
//!
//! A [`RawInput`] is one-hot encoded against the [`FeatureSchema`] the model
//! was trained with, scaled, classified, and the positive-class probability
//! is bucketed into a [`RiskCategory`]. The artifacts are loaded once into a
//! [`ModelContext`], which every prediction then shares read-only.

pub mod artifacts;
pub mod batch;
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod scaler;
pub mod schema;

pub use artifacts::{load_context, ArtifactPaths};
pub use classifier::{Classifier, ClassifierArtifact, KnnClassifier, LogisticClassifier};
pub use encoder::{encode, EncodedVector, FeatureEncoder, UnmappedCategoryPolicy};
pub use error::{Error, Result};
pub use pipeline::{predict, ModelContext, PredictionResult, RiskCategory};
pub use records::{ChestPainType, ExerciseAngina, RawInput, RestingEcg, Sex, StSlope};
pub use scaler::{MinMaxScaler, Scaler, ScalerArtifact, StandardScaler};
pub use schema::FeatureSchema;
