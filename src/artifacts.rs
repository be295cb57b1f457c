use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;

use crate::classifier::{Classifier, ClassifierArtifact};
use crate::encoder::UnmappedCategoryPolicy;
use crate::error::{Error, Result};
use crate::pipeline::ModelContext;
use crate::scaler::{Scaler, ScalerArtifact};
use crate::schema::FeatureSchema;

pub static SCHEMA_FILE: &str = "columns.json";
pub static SCALER_FILE: &str = "scaler.json";
pub static CLASSIFIER_FILE: &str = "classifier.json";

/// Where the three model artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub schema: PathBuf,
    pub scaler: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// The default file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        ArtifactPaths {
            schema: dir.join(SCHEMA_FILE),
            scaler: dir.join(SCALER_FILE),
            classifier: dir.join(CLASSIFIER_FILE),
        }
    }
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Error::ArtifactLoad {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_slice(&bytes).map_err(|source| Error::ArtifactFormat {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_schema(path: &Path) -> Result<FeatureSchema> {
    let schema: FeatureSchema = read_json(path).await?;
    info!("Loaded feature schema with {} columns from {:?}", schema.len(), path);
    Ok(schema)
}

pub async fn load_scaler(path: &Path) -> Result<ScalerArtifact> {
    let scaler: ScalerArtifact = read_json(path).await?;
    scaler.validate()?;
    info!("Loaded scaler for {} features from {:?}", scaler.n_features(), path);
    Ok(scaler)
}

pub async fn load_classifier(path: &Path) -> Result<ClassifierArtifact> {
    let classifier: ClassifierArtifact = read_json(path).await?;
    classifier.validate()?;
    info!("Loaded classifier for {} features from {:?}", classifier.n_features(), path);
    Ok(classifier)
}

/// Reads all artifacts and builds the context every prediction runs against.
pub async fn load_context(paths: &ArtifactPaths, policy: UnmappedCategoryPolicy) -> Result<ModelContext> {
    let (schema, scaler, classifier) = tokio::try_join!(
        load_schema(&paths.schema),
        load_scaler(&paths.scaler),
        load_classifier(&paths.classifier),
    )?;

    ModelContext::with_policy(schema, scaler, classifier, policy)
}
