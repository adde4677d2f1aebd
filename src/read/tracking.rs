//! NAV-SAT epoch records: per-satellite tracking metadata.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{indexed_key, load_record, required_count, required_f64, required_str};
use crate::{constellation::Constellation, error::Result};

/// One satellite-tracking epoch. Unlike observations there is no band
/// split, and every supported entry is extracted, so all fields are
/// required here.
#[derive(Debug)]
pub struct NavSatEpoch {
    pub path: PathBuf,
    pub start_time: String,
    /// The receiver's declared tracked-satellite count, carried verbatim
    /// into the `numSvs` series.
    pub num_svs: u64,
    pub entries: Vec<NavSatEntry>,
}

#[derive(Debug)]
pub struct NavSatEntry {
    pub constellation: Constellation,
    pub sv_id: u16,
    /// Used-in-solution flag; 1.0/0.0 in the raw records (some loggers
    /// encode it as a JSON bool).
    pub used: f64,
    pub cno: f64,
    pub elev: f64,
    pub azim: f64,
    pub pr_res: f64,
    pub quality_ind: f64,
    pub health: f64,
}

impl NavSatEpoch {
    pub fn read(path: &Path) -> Result<NavSatEpoch> {
        let record = load_record(path)?;
        NavSatEpoch::from_record(&record, path)
    }

    pub(crate) fn from_record(record: &Map<String, Value>, path: &Path) -> Result<NavSatEpoch> {
        let start_time = required_str(record, path, "start_time")?;
        let num_svs = required_count(record, path, "numSvs")? as u64;

        let mut entries = Vec::with_capacity(num_svs as usize);
        for index in 1..=num_svs as usize {
            let gnss_id = required_f64(record, path, &indexed_key("gnssId", index))? as u8;
            let constellation = match Constellation::from_gnss_id(gnss_id) {
                Some(c) => c,
                None => continue,
            };
            entries.push(NavSatEntry {
                constellation,
                sv_id: required_f64(record, path, &indexed_key("svId", index))? as u16,
                used: required_f64(record, path, &indexed_key("svUsed", index))?,
                cno: required_f64(record, path, &indexed_key("cno", index))?,
                elev: required_f64(record, path, &indexed_key("elev", index))?,
                azim: required_f64(record, path, &indexed_key("azim", index))?,
                pr_res: required_f64(record, path, &indexed_key("prRes", index))?,
                quality_ind: required_f64(record, path, &indexed_key("qualityInd", index))?,
                health: required_f64(record, path, &indexed_key("health", index))?,
            });
        }

        Ok(NavSatEpoch {
            path: path.to_path_buf(),
            start_time,
            num_svs,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::path::Path;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_entries_and_coerces_bool_flags() {
        let map = record(json!({
            "start_time": "2023-09-12 14-00-01",
            "numSvs": 2,
            "gnssId_01": 0, "svId_01": 3, "svUsed_01": true, "cno_01": 44,
            "elev_01": 61, "azim_01": 142, "prRes_01": -1.2,
            "qualityInd_01": 7, "health_01": 1,
            "gnssId_02": 6, "svId_02": 9, "svUsed_02": false, "cno_02": 38,
            "elev_02": 12, "azim_02": 301, "prRes_02": 3.4,
            "qualityInd_02": 4, "health_02": 1,
        }));
        let epoch = NavSatEpoch::from_record(&map, Path::new("x.json")).unwrap();
        assert_eq!(epoch.num_svs, 2);
        assert_eq!(epoch.entries.len(), 2);
        assert_eq!(epoch.entries[0].used, 1.0);
        assert_eq!(epoch.entries[1].used, 0.0);
        assert_eq!(epoch.entries[1].constellation, Constellation::Glonass);
    }

    #[test]
    fn missing_field_on_supported_entry_is_an_error() {
        let map = record(json!({
            "start_time": "2023-09-12 14-00-01",
            "numSvs": 1,
            "gnssId_01": 0, "svId_01": 3, "svUsed_01": 1, "cno_01": 44,
            "elev_01": 61, "azim_01": 142, "prRes_01": -1.2,
            "qualityInd_01": 7,
        }));
        let err = NavSatEpoch::from_record(&map, Path::new("x.json")).unwrap_err();
        match err {
            Error::MissingField { field, .. } => assert_eq!(field, "health_01"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
