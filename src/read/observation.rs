//! RXM-RAWX epoch records: raw multi-band observations.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{indexed_key, load_record, optional_f64, required_count, required_f64, required_str};
use crate::{constellation::Constellation, error::Result};

/// One observation epoch, parsed out of its flat name-templated form into
/// per-measurement entries. Measurements of unsupported systems are dropped
/// here; nothing downstream would ever touch them.
#[derive(Debug)]
pub struct RawxEpoch {
    /// The record file, kept for error context.
    pub path: PathBuf,
    pub start_time: String,
    pub measurements: Vec<RawxMeasurement>,
}

/// One measurement of one satellite on one signal band.
///
/// The seven quantities are optional at this stage: the raw format carries
/// more bands than are extracted, and a band that is never extracted is
/// allowed to be incomplete. [`crate::extract`] requires them the moment a
/// band matches.
#[derive(Debug)]
pub struct RawxMeasurement {
    /// 1-based index within the record, for naming the offending field in
    /// errors.
    pub index: usize,
    pub constellation: Constellation,
    pub sv_id: u16,
    pub sig_id: u8,
    pub cno: Option<f64>,
    pub pr_mes: Option<f64>,
    pub cp_mes: Option<f64>,
    pub do_mes: Option<f64>,
    pub pr_std: Option<f64>,
    pub cp_std: Option<f64>,
    pub do_std: Option<f64>,
}

impl RawxEpoch {
    pub fn read(path: &Path) -> Result<RawxEpoch> {
        let record = load_record(path)?;
        RawxEpoch::from_record(&record, path)
    }

    pub(crate) fn from_record(record: &Map<String, Value>, path: &Path) -> Result<RawxEpoch> {
        let start_time = required_str(record, path, "start_time")?;
        let num_meas = required_count(record, path, "numMeas")?;

        let mut measurements = Vec::with_capacity(num_meas);
        for index in 1..=num_meas {
            let gnss_id = required_f64(record, path, &indexed_key("gnssId", index))? as u8;
            let constellation = match Constellation::from_gnss_id(gnss_id) {
                Some(c) => c,
                None => continue,
            };
            let sv_id = required_f64(record, path, &indexed_key("svId", index))? as u16;
            let sig_id = required_f64(record, path, &indexed_key("sigId", index))? as u8;
            measurements.push(RawxMeasurement {
                index,
                constellation,
                sv_id,
                sig_id,
                cno: optional_f64(record, &indexed_key("cno", index)),
                pr_mes: optional_f64(record, &indexed_key("prMes", index)),
                cp_mes: optional_f64(record, &indexed_key("cpMes", index)),
                do_mes: optional_f64(record, &indexed_key("doMes", index)),
                pr_std: optional_f64(record, &indexed_key("prStd", index)),
                cp_std: optional_f64(record, &indexed_key("cpStd", index)),
                do_std: optional_f64(record, &indexed_key("doStd", index)),
            });
        }

        Ok(RawxEpoch {
            path: path.to_path_buf(),
            start_time,
            measurements,
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
    fn parses_both_index_templates() {
        let mut map = Map::new();
        map.insert("start_time".into(), json!("2023-09-12 14-00-01"));
        map.insert("numMeas".into(), json!(11));
        for i in 1..=11usize {
            let key = |base: &str| indexed_key(base, i);
            map.insert(key("gnssId"), json!(0));
            map.insert(key("svId"), json!(i));
            map.insert(key("sigId"), json!(0));
            for base in ["cno", "prMes", "cpMes", "doMes", "prStd", "cpStd", "doStd"] {
                map.insert(key(base), json!(i as f64));
            }
        }
        let epoch = RawxEpoch::from_record(&map, Path::new("x.json")).unwrap();
        assert_eq!(epoch.measurements.len(), 11);
        assert_eq!(epoch.measurements[9].index, 10);
        assert_eq!(epoch.measurements[9].sv_id, 10);
        assert_eq!(epoch.measurements[10].cno, Some(11.0));
    }

    #[test]
    fn unsupported_systems_are_dropped_without_touching_their_fields() {
        // An SBAS measurement with nothing but its gnssId must not error.
        let map = record(json!({
            "start_time": "2023-09-12 14-00-01",
            "numMeas": 2,
            "gnssId_01": 1,
            "gnssId_02": 0, "svId_02": 7, "sigId_02": 0,
            "cno_02": 40.0, "prMes_02": 2.1e7, "cpMes_02": 1.1e8,
            "doMes_02": -310.5, "prStd_02": 2.0, "cpStd_02": 0.01,
            "doStd_02": 0.5,
        }));
        let epoch = RawxEpoch::from_record(&map, Path::new("x.json")).unwrap();
        assert_eq!(epoch.measurements.len(), 1);
        assert_eq!(epoch.measurements[0].constellation, Constellation::Gps);
    }

    #[test]
    fn missing_declared_gnss_id_is_an_error() {
        let map = record(json!({
            "start_time": "2023-09-12 14-00-01",
            "numMeas": 2,
            "gnssId_01": 0, "svId_01": 7, "sigId_01": 0,
        }));
        let err = RawxEpoch::from_record(&map, Path::new("x.json")).unwrap_err();
        match err {
            Error::MissingField { field, .. } => assert_eq!(field, "gnssId_02"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quantities_stay_optional_at_load() {
        let map = record(json!({
            "start_time": "2023-09-12 14-00-01",
            "numMeas": 1,
            "gnssId_01": 0, "svId_01": 7, "sigId_01": 1,
        }));
        let epoch = RawxEpoch::from_record(&map, Path::new("x.json")).unwrap();
        assert_eq!(epoch.measurements[0].cno, None);
    }
}
