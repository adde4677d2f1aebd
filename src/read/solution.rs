//! Navigation-solution epoch records: the NAV-PVT file-group family.
//!
//! These records have no per-satellite dimension, so they deserialize
//! straight into typed structs. Scalars are kept as raw JSON numbers so
//! integers survive verbatim into the written document.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

fn read_typed<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// NAV-PVT: the position/velocity/time solution proper.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvtEpoch {
    #[serde(rename = "start_time")]
    pub start_time: String,
    #[serde(rename = "numSV")]
    pub num_sv: Value,
    pub nano: Value,
    pub lon: Value,
    pub lat: Value,
    pub height: Value,
    pub vel_n: Value,
    pub vel_e: Value,
    pub vel_d: Value,
    #[serde(rename = "hMSL")]
    pub h_msl: Value,
    pub h_acc: Value,
    pub v_acc: Value,
    pub s_acc: Value,
    pub g_speed: Value,
    pub head_mot: Value,
    pub head_acc: Value,
}

impl PvtEpoch {
    pub fn read(path: &Path) -> Result<PvtEpoch> {
        read_typed(path)
    }
}

/// NAV-POSECEF: earth-centred earth-fixed position.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosecefEpoch {
    pub ecef_x: Value,
    pub ecef_y: Value,
    pub ecef_z: Value,
}

impl PosecefEpoch {
    pub fn read(path: &Path) -> Result<PosecefEpoch> {
        read_typed(path)
    }
}

/// NAV-CLOCK: receiver clock bias/drift and their accuracies.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockEpoch {
    pub clk_b: Value,
    pub clk_d: Value,
    pub t_acc: Value,
    pub f_acc: Value,
}

impl ClockEpoch {
    pub fn read(path: &Path) -> Result<ClockEpoch> {
        read_typed(path)
    }
}

/// NAV-DOP: dilution-of-precision components.
#[derive(Debug, Deserialize)]
pub struct DopEpoch {
    #[serde(rename = "gDOP")]
    pub g_dop: Value,
    #[serde(rename = "pDOP")]
    pub p_dop: Value,
    #[serde(rename = "tDOP")]
    pub t_dop: Value,
    #[serde(rename = "vDOP")]
    pub v_dop: Value,
    #[serde(rename = "hDOP")]
    pub h_dop: Value,
    #[serde(rename = "nDOP")]
    pub n_dop: Value,
    #[serde(rename = "eDOP")]
    pub e_dop: Value,
}

impl DopEpoch {
    pub fn read(path: &Path) -> Result<DopEpoch> {
        read_typed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pvt_integers_stay_integers() {
        let raw = json!({
            "start_time": "2023-09-12 14-00-01",
            "numSV": 17, "nano": -31415,
            "lon": 102.8329, "lat": 24.8801, "height": 1972.41,
            "velN": 0.01, "velE": -0.02, "velD": 0.0,
            "hMSL": 1941.2, "hAcc": 1.2, "vAcc": 1.8, "sAcc": 0.05,
            "gSpeed": 0.02, "headMot": 0.0, "headAcc": 180.0,
            "iTOW": 208800000,
        });
        let epoch: PvtEpoch = serde_json::from_value(raw).unwrap();
        assert_eq!(epoch.num_sv, json!(17));
        assert_eq!(epoch.nano, json!(-31415));
        assert_eq!(epoch.vel_n, json!(0.01));
    }

    #[test]
    fn dop_fields_use_their_upper_case_names() {
        let raw = json!({
            "gDOP": 1.5, "pDOP": 1.3, "tDOP": 0.7, "vDOP": 1.0,
            "hDOP": 0.8, "nDOP": 0.6, "eDOP": 0.5,
        });
        let epoch: DopEpoch = serde_json::from_value(raw).unwrap();
        assert_eq!(epoch.g_dop, json!(1.5));
        assert_eq!(epoch.e_dop, json!(0.5));
    }

    #[test]
    fn missing_group_field_is_a_parse_error() {
        let raw = json!({ "ecefX": 1.0, "ecefY": 2.0 });
        assert!(serde_json::from_value::<PosecefEpoch>(raw).is_err());
    }
}
