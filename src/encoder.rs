//! One-hot expansion of a [`RawInput`] into the fixed column layout of a
//! [`FeatureSchema`].

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::records::{one_hot_column, RawInput, CATEGORICAL_FIELDS, NUMERIC_COLUMNS};
use crate::schema::FeatureSchema;

/// What to do when an input maps to a column the schema does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedCategoryPolicy {
    /// Every numeric field and every category level must have a column,
    /// checked when the encoder is built.
    Reject,
    /// Like `Reject`, except a field with exactly one level missing treats
    /// that level as the reference level of a drop-first encoding: it
    /// encodes as all zeros.
    #[default]
    AllowBaseline,
    /// Drop any value whose column is missing and keep going.
    Ignore,
}

/// A numeric record laid out exactly as its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector<'s> {
    schema: &'s FeatureSchema,
    values: Vec<f64>,
}

impl<'s> EncodedVector<'s> {
    /// Builds a vector from named values: schema columns without an entry
    /// are 0, entries without a schema column are returned separately.
    pub fn align<'n, I>(entries: I, schema: &'s FeatureSchema) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (&'n str, f64)>,
    {
        let mut values = vec![0.0; schema.len()];
        let mut dropped = Vec::new();
        for (name, value) in entries {
            match schema.position(name) {
                Some(position) => values[position] = value,
                None => dropped.push(name.to_string()),
            }
        }
        (EncodedVector { schema, values }, dropped)
    }

    /// Re-selects this vector's values by name for `schema`.
    pub fn realign<'t>(&self, schema: &'t FeatureSchema) -> EncodedVector<'t> {
        let (aligned, dropped) = EncodedVector::align(self.iter(), schema);
        if !dropped.is_empty() {
            warn!("Dropped columns absent from schema: {:?}", dropped);
        }
        aligned
    }

    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|position| self.values[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'s str, f64)> + '_ {
        let schema = self.schema;
        schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Schema positions of one categorical field's levels.
#[derive(Debug, Clone)]
struct FieldSlots {
    field: &'static str,
    codes: &'static [&'static str],
    positions: Vec<Option<usize>>,
    baseline: Option<usize>,
}

/// Precomputed mapping from input fields to schema positions.
#[derive(Debug, Clone)]
struct Layout {
    policy: UnmappedCategoryPolicy,
    width: usize,
    numeric: Vec<Option<usize>>,
    categorical: Vec<FieldSlots>,
}

impl Layout {
    fn new(schema: &FeatureSchema, policy: UnmappedCategoryPolicy) -> Result<Self> {
        let mut numeric = Vec::with_capacity(NUMERIC_COLUMNS.len());
        for column in NUMERIC_COLUMNS {
            let position = schema.position(column);
            if position.is_none() {
                if policy != UnmappedCategoryPolicy::Ignore {
                    return Err(Error::UnmappedColumn {
                        column: column.to_string(),
                    });
                }
                warn!("Numeric column {} is not in the schema and will be dropped", column);
            }
            numeric.push(position);
        }

        let mut categorical = Vec::with_capacity(CATEGORICAL_FIELDS.len());
        for (field, codes) in CATEGORICAL_FIELDS {
            let positions: Vec<Option<usize>> = codes
                .iter()
                .map(|code| schema.position(&one_hot_column(field, code)))
                .collect();
            let missing: Vec<usize> = (0..codes.len())
                .filter(|&index| positions[index].is_none())
                .collect();
            let baseline = match (policy, missing.as_slice()) {
                (_, []) | (UnmappedCategoryPolicy::Ignore, _) => None,
                (UnmappedCategoryPolicy::AllowBaseline, &[index]) => {
                    debug!("{} uses {} as its reference level", field, codes[index]);
                    Some(index)
                }
                (_, &[index, ..]) => {
                    return Err(Error::UnmappedCategory {
                        column: one_hot_column(field, codes[index]),
                    });
                }
            };
            categorical.push(FieldSlots {
                field,
                codes,
                positions,
                baseline,
            });
        }

        Ok(Layout {
            policy,
            width: schema.len(),
            numeric,
            categorical,
        })
    }

    fn encode<'s>(&self, raw: &RawInput, schema: &'s FeatureSchema) -> Result<EncodedVector<'s>> {
        let mut values = vec![0.0; self.width];

        for (position, value) in self.numeric.iter().zip(raw.numeric_values()) {
            if let Some(position) = *position {
                values[position] = value;
            }
        }

        for (slots, index) in self.categorical.iter().zip(raw.category_indices()) {
            match slots.positions[index] {
                Some(position) => values[position] = 1.0,
                None if slots.baseline == Some(index) => {}
                // only reachable under `Ignore`, other policies fail in `Layout::new`
                None => warn!(
                    "Category column {} is not in the schema, value dropped",
                    one_hot_column(slots.field, slots.codes[index])
                ),
            }
        }

        Ok(EncodedVector { schema, values })
    }
}

/// Encodes inputs against one schema, reusing the column positions.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    layout: Layout,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema, policy: UnmappedCategoryPolicy) -> Result<Self> {
        let layout = Layout::new(&schema, policy)?;
        Ok(FeatureEncoder { schema, layout })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn policy(&self) -> UnmappedCategoryPolicy {
        self.layout.policy
    }

    pub fn encode(&self, raw: &RawInput) -> Result<EncodedVector<'_>> {
        self.layout.encode(raw, &self.schema)
    }
}

/// Encodes a single input with the default policy.
pub fn encode<'s>(raw: &RawInput, schema: &'s FeatureSchema) -> Result<EncodedVector<'s>> {
    Layout::new(schema, UnmappedCategoryPolicy::default())?.encode(raw, schema)
}
