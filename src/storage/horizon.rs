// projeto: lstmmodelstore
// file: src/storage/horizon.rs
// Forecast horizons and the scaler files keyed by them

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Horizon {
    Days7,
    Days14,
    Days30,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Days7, Horizon::Days14, Horizon::Days30];

    pub fn days(self) -> u32 {
        match self {
            Horizon::Days7 => 7,
            Horizon::Days14 => 14,
            Horizon::Days30 => 30,
        }
    }

    pub fn from_days(days: u32) -> Option<Horizon> {
        Horizon::ALL.into_iter().find(|h| h.days() == days)
    }
}

impl TryFrom<u32> for Horizon {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Horizon::from_days(days).ok_or_else(|| format!("unsupported horizon: {} days", days))
    }
}

impl From<Horizon> for u32 {
    fn from(h: Horizon) -> u32 {
        h.days()
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// One of the four scaler files stored with every version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "horizon")]
pub enum ScalerKind {
    Target(Horizon),
    Feature,
}

impl ScalerKind {
    pub const ALL: [ScalerKind; 4] = [
        ScalerKind::Target(Horizon::Days7),
        ScalerKind::Target(Horizon::Days14),
        ScalerKind::Target(Horizon::Days30),
        ScalerKind::Feature,
    ];

    pub fn file_name(self) -> String {
        match self {
            ScalerKind::Target(h) => format!("scaler_{}d.json", h.days()),
            ScalerKind::Feature => "feature_scaler.json".to_string(),
        }
    }

    pub fn from_file_name(name: &str) -> Option<ScalerKind> {
        ScalerKind::ALL.into_iter().find(|k| k.file_name() == name)
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerKind::Target(h) => write!(f, "target scaler {}", h),
            ScalerKind::Feature => f.write_str("feature scaler"),
        }
    }
}
