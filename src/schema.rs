use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered feature columns the scaler and classifier were fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(invalid("schema has no columns".to_string()));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(invalid(format!("empty column name at position {}", position)));
            }
            if positions.insert(name.clone(), position).is_some() {
                return Err(invalid(format!("duplicate column {:?}", name)));
            }
        }

        Ok(FeatureSchema { columns, positions })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Checks that `names` are exactly this schema's columns, in order.
    pub fn check_names(&self, names: &[String]) -> Result<()> {
        if names.len() != self.len() {
            return Err(Error::SchemaMismatch {
                expected: self.len(),
                found: names.len(),
            });
        }
        for (position, (expected, found)) in self.columns.iter().zip(names).enumerate() {
            if expected != found {
                return Err(Error::FeatureNameMismatch {
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = Error;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        FeatureSchema::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidArtifact {
        artifact: "schema",
        reason,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every level of every field one-hot encoded.
    pub(crate) const FULL_COLUMNS: [&str; 20] = [
        "Age",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "MaxHR",
        "Oldpeak",
        "Sex_F",
        "Sex_M",
        "ChestPainType_ASY",
        "ChestPainType_ATA",
        "ChestPainType_NAP",
        "ChestPainType_TA",
        "RestingECG_LVH",
        "RestingECG_Normal",
        "RestingECG_ST",
        "ExerciseAngina_N",
        "ExerciseAngina_Y",
        "ST_Slope_Down",
        "ST_Slope_Flat",
        "ST_Slope_Up",
    ];

    /// `get_dummies(drop_first=True)` layout: first level of each field dropped.
    pub(crate) const DROP_FIRST_COLUMNS: [&str; 15] = [
        "Age",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "MaxHR",
        "Oldpeak",
        "Sex_M",
        "ChestPainType_ATA",
        "ChestPainType_NAP",
        "ChestPainType_TA",
        "RestingECG_Normal",
        "RestingECG_ST",
        "ExerciseAngina_Y",
        "ST_Slope_Flat",
        "ST_Slope_Up",
    ];

    pub(crate) fn full_schema() -> FeatureSchema {
        FeatureSchema::new(FULL_COLUMNS).unwrap()
    }

    pub(crate) fn drop_first_schema() -> FeatureSchema {
        FeatureSchema::new(DROP_FIRST_COLUMNS).unwrap()
    }

    #[test]
    fn positions_follow_column_order() {
        let schema = full_schema();
        assert_eq!(schema.len(), 20);
        assert_eq!(schema.position("Age"), Some(0));
        assert_eq!(schema.position("ST_Slope_Up"), Some(19));
        assert_eq!(schema.position("HeartDisease"), None);
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert!(FeatureSchema::new(["Age", "Age"]).is_err());
        assert!(FeatureSchema::new(Vec::<String>::new()).is_err());
        assert!(FeatureSchema::new(["Age", " "]).is_err());
    }

    #[test]
    fn deserializes_from_json_array() {
        let schema: FeatureSchema = serde_json::from_str(r#"["Age", "Sex_M"]"#).unwrap();
        assert_eq!(schema.columns(), ["Age", "Sex_M"]);
        assert!(serde_json::from_str::<FeatureSchema>(r#"["Age", "Age"]"#).is_err());
    }

    #[test]
    fn check_names_reports_first_difference() {
        let schema = FeatureSchema::new(["Age", "MaxHR"]).unwrap();
        let swapped = vec!["MaxHR".to_string(), "Age".to_string()];
        assert!(matches!(
            schema.check_names(&swapped),
            Err(Error::FeatureNameMismatch { position: 0, .. })
        ));
        assert!(matches!(
            schema.check_names(&["Age".to_string()]),
            Err(Error::SchemaMismatch { expected: 2, found: 1 })
        ));
    }
}
