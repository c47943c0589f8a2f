use loadgen_common::{LoadgenError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const FEATURE_COLUMNS: [&str; 3] = ["pressure", "flow", "radius"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub pressure: f64,
    pub flow: f64,
    pub radius: f64,
}

impl Sample {
    pub const FIXED: Sample = Sample { pressure: 120.0, flow: 4.2, radius: 0.35 };

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            pressure: rng.gen_range(80.0..140.0),
            flow: rng.gen_range(2.0..6.0),
            radius: rng.gen_range(0.2..0.45),
        }
    }

    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn row(&self) -> Vec<f64> {
        vec![self.pressure, self.flow, self.radius]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframeSplit {
    pub columns: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

/// Request body in the `dataframe_split` orientation: column names plus rows
/// whose values line up with them by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationPayload {
    pub dataframe_split: DataframeSplit,
}

impl InvocationPayload {
    pub fn fixed() -> Self {
        Self::from_sample(&Sample::FIXED)
    }

    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            dataframe_split: DataframeSplit {
                columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                data: vec![sample.row()],
            },
        }
    }

    /// Fault-injection body: drops the `radius` column, which a correctly
    /// deployed model rejects.
    pub fn missing_radius() -> Self {
        Self {
            dataframe_split: DataframeSplit {
                columns: vec!["pressure".into(), "flow".into()],
                data: vec![vec![Sample::FIXED.pressure, Sample::FIXED.flow]],
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LoadgenError::Serialization(e.to_string()))
    }

    /// Columns are exactly the feature columns and every row has one value per column.
    pub fn matches_features(&self) -> bool {
        let split = &self.dataframe_split;
        split.columns.iter().map(String::as_str).eq(FEATURE_COLUMNS)
            && split.data.iter().all(|row| row.len() == FEATURE_COLUMNS.len())
    }
}
