use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::{Error, Result};

/// A categorical clinical field with a closed set of levels.
///
/// `FIELD` is the prefix of the field's one-hot columns and `CODES` lists the
/// level codes in declaration order, so `"{FIELD}_{CODES[i]}"` is the column
/// name of the i-th level.
pub trait Categorical: Copy {
    const FIELD: &'static str;
    const CODES: &'static [&'static str];

    fn index(self) -> usize;

    fn code(self) -> &'static str {
        Self::CODES[self.index()]
    }

    fn column(self) -> String {
        one_hot_column(Self::FIELD, self.code())
    }
}

pub fn one_hot_column(field: &str, code: &str) -> String {
    format!("{}_{}", field, code)
}

macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident, $field:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl Categorical for $name {
            const FIELD: &'static str = $field;
            const CODES: &'static [&'static str] = &[$($code),+];

            fn index(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $(
                    if s.eq_ignore_ascii_case($code) {
                        return Ok($name::$variant);
                    }
                )+
                Err(Error::InvalidInput {
                    field: $field,
                    value: s.to_string(),
                })
            }
        }

        // same matching rule as the command line
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let code = String::deserialize(deserializer)?;
                code.parse::<$name>().map_err(de::Error::custom)
            }
        }
    };
}

categorical!(Sex, "Sex", { Male => "M", Female => "F" });

categorical!(ChestPainType, "ChestPainType", {
    AtypicalAngina => "ATA",
    NonAnginalPain => "NAP",
    TypicalAngina => "TA",
    Asymptomatic => "ASY",
});

categorical!(
    /// Resting electrocardiogram result.
    RestingEcg, "RestingECG", {
    Normal => "Normal",
    StTAbnormality => "ST",
    LeftVentricularHypertrophy => "LVH",
});

categorical!(ExerciseAngina, "ExerciseAngina", { Yes => "Y", No => "N" });

categorical!(
    /// Slope of the peak exercise ST segment.
    StSlope, "ST_Slope", {
    Up => "Up",
    Flat => "Flat",
    Down => "Down",
});

/// Schema names of the numeric fields, in `RawInput::numeric_values` order.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "Age",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "MaxHR",
    "Oldpeak",
];

/// One-hot prefix and level codes of every categorical field, in
/// `RawInput::category_indices` order.
pub const CATEGORICAL_FIELDS: [(&str, &[&str]); 5] = [
    (Sex::FIELD, Sex::CODES),
    (ChestPainType::FIELD, ChestPainType::CODES),
    (RestingEcg::FIELD, RestingEcg::CODES),
    (ExerciseAngina::FIELD, ExerciseAngina::CODES),
    (StSlope::FIELD, StSlope::CODES),
];

const AGE_RANGE: RangeInclusive<u32> = 18..=100;
const RESTING_BP_RANGE: RangeInclusive<u32> = 80..=200;
const CHOLESTEROL_RANGE: RangeInclusive<u32> = 100..=600;
const MAX_HR_RANGE: RangeInclusive<u32> = 60..=220;
const OLDPEAK_RANGE: RangeInclusive<f64> = 0.0..=6.0;

/// One patient's risk factors as entered on the form.
///
/// Field names follow the columns of the heart failure dataset so a CSV export
/// of it deserializes directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawInput {
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Sex")]
    pub sex: Sex,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: ChestPainType,
    #[serde(rename = "RestingBP")]
    pub resting_bp: u32,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: u32,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: u8,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    pub max_hr: u32,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: StSlope,
}

impl RawInput {
    /// Column headers in dataset order.
    pub const HEADERS: [&'static str; 11] = [
        "Age",
        "Sex",
        "ChestPainType",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "RestingECG",
        "MaxHR",
        "ExerciseAngina",
        "Oldpeak",
        "ST_Slope",
    ];

    pub fn numeric_values(&self) -> [f64; 6] {
        [
            f64::from(self.age),
            f64::from(self.resting_bp),
            f64::from(self.cholesterol),
            f64::from(self.fasting_bs),
            f64::from(self.max_hr),
            self.oldpeak,
        ]
    }

    pub fn category_indices(&self) -> [usize; 5] {
        [
            self.sex.index(),
            self.chest_pain_type.index(),
            self.resting_ecg.index(),
            self.exercise_angina.index(),
            self.st_slope.index(),
        ]
    }

    /// One-hot column names selected by this input.
    pub fn category_columns(&self) -> [String; 5] {
        [
            self.sex.column(),
            self.chest_pain_type.column(),
            self.resting_ecg.column(),
            self.exercise_angina.column(),
            self.st_slope.column(),
        ]
    }

    /// Checks the numeric fields against the ranges the entry form allows.
    pub fn validate(&self) -> Result<()> {
        check_range("Age", self.age, &AGE_RANGE)?;
        check_range("RestingBP", self.resting_bp, &RESTING_BP_RANGE)?;
        check_range("Cholesterol", self.cholesterol, &CHOLESTEROL_RANGE)?;
        check_range("FastingBS", self.fasting_bs, &(0..=1))?;
        check_range("MaxHR", self.max_hr, &MAX_HR_RANGE)?;
        if !self.oldpeak.is_finite() || !OLDPEAK_RANGE.contains(&self.oldpeak) {
            return Err(Error::InvalidInput {
                field: "Oldpeak",
                value: self.oldpeak.to_string(),
            });
        }
        Ok(())
    }

    /// Values in `HEADERS` order, as written to CSV.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.age.to_string(),
            self.sex.to_string(),
            self.chest_pain_type.to_string(),
            self.resting_bp.to_string(),
            self.cholesterol.to_string(),
            self.fasting_bs.to_string(),
            self.resting_ecg.to_string(),
            self.max_hr.to_string(),
            self.exercise_angina.to_string(),
            self.oldpeak.to_string(),
            self.st_slope.to_string(),
        ]
    }
}

fn check_range<T>(field: &'static str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + ToString,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput {
            field,
            value: value.to_string(),
        })
    }
}
