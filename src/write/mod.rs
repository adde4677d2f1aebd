//! Persisting (and re-loading) hourly summary documents.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::trace;
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    read::load_record,
    series::SeriesBundle,
    RecordKind,
};

/// Write one unit's document to `<out_root>/<day>/<stem><hour>.json`,
/// creating the day directory if absent. An existing document for the same
/// unit is replaced (last write wins). The document is staged next to its
/// final name and renamed into place, so a failed unit never leaves a
/// truncated document behind.
pub fn write_summary(
    out_root: &Path,
    day: &str,
    hour: u8,
    kind: RecordKind,
    bundle: SeriesBundle,
) -> Result<PathBuf> {
    let day_dir = out_root.join(day);
    fs::create_dir_all(&day_dir).map_err(|source| Error::Write {
        path: day_dir.clone(),
        source,
    })?;

    let path = day_dir.join(format!("{}{hour}.json", kind.document_stem()));
    let document = Value::Object(bundle.into_document());
    let bytes =
        serde_json::to_vec_pretty(&document).expect("documents hold only finite numbers and strings");
    trace!("{}: {} bytes", path.display(), bytes.len());

    let staged = path.with_extension("json.part");
    fs::write(&staged, bytes).map_err(|source| Error::Write {
        path: staged.clone(),
        source,
    })?;
    fs::rename(&staged, &path).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Read a written document back into its key → array mapping. This is the
/// interface the plotting side consumes; keys come back in document order.
pub fn load_summary(path: &Path) -> Result<Map<String, Value>> {
    load_record(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::{aggregate_hour, OBSERVATION_DIR},
        series::SeriesBundle,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ubxlog-write-{}-{}",
            std::process::id(),
            TEST_DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn documents_are_named_after_their_unit() {
        let out = scratch_dir();
        let mut bundle = SeriesBundle::new();
        bundle.declare_scalar("recordTime");
        let path = write_summary(&out, "12", 14, RecordKind::Tracking, bundle).unwrap();
        assert!(path.ends_with(Path::new("12").join("satelliteInfomation14.json")));
        assert!(path.is_file());
    }

    #[test]
    fn a_written_document_loads_back_unchanged() {
        let raw_day = scratch_dir();
        let obs_dir = raw_day.join("14").join(OBSERVATION_DIR);
        fs::create_dir_all(&obs_dir).unwrap();
        fs::write(
            obs_dir.join("2023-09-12 14-00-01.json"),
            json!({
                "start_time": "2023-09-12 14-00-01",
                "numMeas": 1,
                "gnssId_01": 0, "svId_01": 5, "sigId_01": 0,
                "cno_01": 42, "prMes_01": 2.1e7, "cpMes_01": 1.1e8,
                "doMes_01": -310.5, "prStd_01": 2.0, "cpStd_01": 0.01,
                "doStd_01": 0.5,
            })
            .to_string(),
        )
        .unwrap();

        let bundle = aggregate_hour(&raw_day, 14, RecordKind::Observation).unwrap();
        let expected = {
            let bundle = aggregate_hour(&raw_day, 14, RecordKind::Observation).unwrap();
            bundle.into_document()
        };

        let out = scratch_dir();
        let path = write_summary(&out, "12", 14, RecordKind::Observation, bundle).unwrap();
        let loaded = load_summary(&path).unwrap();
        assert_eq!(Value::Object(loaded), Value::Object(expected));
    }

    #[test]
    fn rewriting_a_unit_replaces_its_document() {
        let out = scratch_dir();
        let mut first = SeriesBundle::new();
        first.declare_scalar("recordTime");
        first.push_scalar("recordTime", json!("2023-09-12 14-00-01"));
        first.seal_epoch().unwrap();
        let path = write_summary(&out, "12", 14, RecordKind::Solution, first).unwrap();

        let mut second = SeriesBundle::new();
        second.declare_scalar("recordTime");
        let rewritten = write_summary(&out, "12", 14, RecordKind::Solution, second).unwrap();
        assert_eq!(path, rewritten);
        let loaded = load_summary(&path).unwrap();
        assert_eq!(loaded["recordTime"], json!([]));
    }
}
