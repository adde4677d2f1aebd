//! The hourly aggregator: fold every epoch of one (day, hour, record kind)
//! unit into a sealed series bundle.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use itertools::izip;
use serde_json::Value;

use crate::{
    constellation::Constellation,
    error::{Error, Result},
    extract::{extract_observation, extract_tracking},
    read::{
        observation::RawxEpoch,
        parse_stamp,
        solution::{ClockEpoch, DopEpoch, PosecefEpoch, PvtEpoch},
        tracking::NavSatEpoch,
    },
    series::{SeriesBundle, ABSENT_SENTINEL},
    RecordKind,
};

/// Input directory names under `<day>/<hour>/`, as the logger writes them.
pub const OBSERVATION_DIR: &str = "RXM-RAWX";
pub const TRACKING_DIR: &str = "NAV-SAT";
pub const SOLUTION_DIRS: [&str; 4] = ["NAV-PVT", "NAV-POSECEF", "NAV-CLOCK", "NAV-DOP"];

/// The quantity prefixes of an observation band, in document order.
const OBS_QUANTITIES: [&str; 7] = ["prMes", "doMes", "cpMes", "cn0", "prStd", "cpStd", "doStd"];

/// The per-constellation tracking series prefixes, in document order.
/// `svUsed`, `qualityInd` and `health` fill with the absence sentinel.
const TRACKING_QUANTITIES: [(&str, f64); 8] = [
    ("svId", 0.0),
    ("svUsed", ABSENT_SENTINEL),
    ("cno", 0.0),
    ("elev", 0.0),
    ("azim", 0.0),
    ("prRes", 0.0),
    ("qualityInd", 0.0),
    ("health", ABSENT_SENTINEL),
];

/// The navigation-solution scalar keys, in document order, grouped by the
/// file group that carries them.
const PVT_KEYS: [&str; 15] = [
    "numSV", "nano", "lon", "lat", "height", "velN", "velE", "velD", "hMSL", "hAcc", "vAcc",
    "sAcc", "gSpeed", "headMot", "headAcc",
];
const POSECEF_KEYS: [&str; 3] = ["ecefX", "ecefY", "ecefZ"];
const CLOCK_KEYS: [&str; 4] = ["clkB", "clkD", "tAcc", "fAcc"];
const DOP_KEYS: [&str; 7] = ["gDOP", "pDOP", "tDOP", "vDOP", "hDOP", "nDOP", "eDOP"];

/// Aggregate one unit. `day_dir` is the raw day directory; the hour and
/// kind select the input directories underneath it.
pub fn aggregate_hour(day_dir: &Path, hour: u8, kind: RecordKind) -> Result<SeriesBundle> {
    match kind {
        RecordKind::Observation => aggregate_observation(day_dir, hour),
        RecordKind::Tracking => aggregate_tracking(day_dir, hour),
        RecordKind::Solution => aggregate_solution(day_dir, hour),
    }
}

fn hour_dir(day_dir: &Path, hour: u8, group: &str) -> PathBuf {
    day_dir.join(hour.to_string()).join(group)
}

/// List an hour's epoch files, ordered by the stamp embedded in each file
/// name. Listing order is not temporal order, so the sort is explicit; a
/// file whose stem carries no parseable stamp is a hard error for the unit.
fn discover_epochs(dir: &Path) -> Result<Vec<(Epoch, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::MissingInputDir(dir.to_path_buf()));
    }
    let mut epochs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })? {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        // Stray non-record files (.DS_Store and friends) are skipped.
        if path.extension().and_then(OsStr::to_str) != Some("json") {
            continue;
        }
        let stem = file_stem(&path);
        match parse_stamp(&stem) {
            Some(stamp) => epochs.push((stamp, path)),
            None => return Err(Error::BadStamp { path, stamp: stem }),
        }
    }
    epochs.sort_by_key(|&(stamp, _)| stamp);
    Ok(epochs)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string()
}

fn band_key(quantity: &str, constellation: Constellation, band: u8) -> String {
    format!("{quantity}_{}{band}", constellation.letter())
}

fn constellation_key(quantity: &str, constellation: Constellation) -> String {
    format!("{quantity}_{}", constellation.letter())
}

fn observation_bundle() -> SeriesBundle {
    let mut bundle = SeriesBundle::new();
    bundle.declare_scalar("recordTime");
    for c in Constellation::ALL {
        bundle.declare_rows(&format!("VS{}", c.letter()), c.capacity(), 0.0);
    }
    for c in Constellation::ALL {
        for band in [1, 2] {
            for quantity in OBS_QUANTITIES {
                bundle.declare_rows(&band_key(quantity, c, band), c.capacity(), 0.0);
            }
        }
    }
    bundle
}

fn aggregate_observation(day_dir: &Path, hour: u8) -> Result<SeriesBundle> {
    let epochs = discover_epochs(&hour_dir(day_dir, hour, OBSERVATION_DIR))?;
    let mut bundle = observation_bundle();
    for (_, path) in &epochs {
        let record = RawxEpoch::read(path)?;
        bundle.push_scalar("recordTime", Value::String(record.start_time.clone()));
        for c in Constellation::ALL {
            let rows = extract_observation(&record, c)?;
            bundle.push_row(&format!("VS{}", c.letter()), rows.visible);
            for (band, band_rows) in [(1, rows.band1), (2, rows.band2)] {
                for (quantity, row) in band_rows.into_named() {
                    bundle.push_row(&band_key(quantity, c, band), row);
                }
            }
        }
        bundle.seal_epoch()?;
    }
    Ok(bundle)
}

fn tracking_bundle() -> SeriesBundle {
    let mut bundle = SeriesBundle::new();
    bundle.declare_scalar("recordTime");
    bundle.declare_scalar("numSvs");
    for c in Constellation::ALL {
        for (quantity, fill) in TRACKING_QUANTITIES {
            bundle.declare_rows(&constellation_key(quantity, c), c.capacity(), fill);
        }
    }
    bundle
}

fn aggregate_tracking(day_dir: &Path, hour: u8) -> Result<SeriesBundle> {
    let epochs = discover_epochs(&hour_dir(day_dir, hour, TRACKING_DIR))?;
    let mut bundle = tracking_bundle();
    for (_, path) in &epochs {
        let record = NavSatEpoch::read(path)?;
        bundle.push_scalar("recordTime", Value::String(record.start_time.clone()));
        bundle.push_scalar("numSvs", Value::from(record.num_svs));
        for c in Constellation::ALL {
            for (quantity, row) in extract_tracking(&record, c).into_named() {
                bundle.push_row(&constellation_key(quantity, c), row);
            }
        }
        bundle.seal_epoch()?;
    }
    Ok(bundle)
}

fn solution_bundle() -> SeriesBundle {
    let mut bundle = SeriesBundle::new();
    bundle.declare_scalar("recordTime");
    for key in PVT_KEYS
        .iter()
        .chain(&POSECEF_KEYS)
        .chain(&CLOCK_KEYS)
        .chain(&DOP_KEYS)
    {
        bundle.declare_scalar(key);
    }
    bundle
}

/// The four navigation-solution groups carry no shared record ids; they
/// are joined by ordinal position, which is only sound when all four hold
/// the same epochs in the same order. Counts and per-ordinal stamps are
/// checked before anything is folded, so misaligned inputs never produce a
/// document.
fn aggregate_solution(day_dir: &Path, hour: u8) -> Result<SeriesBundle> {
    let [pvt_dir, posecef_dir, clock_dir, dop_dir] = SOLUTION_DIRS;
    let pvt = discover_epochs(&hour_dir(day_dir, hour, pvt_dir))?;
    let posecef = discover_epochs(&hour_dir(day_dir, hour, posecef_dir))?;
    let clock = discover_epochs(&hour_dir(day_dir, hour, clock_dir))?;
    let dop = discover_epochs(&hour_dir(day_dir, hour, dop_dir))?;

    for (group, listing) in [
        (posecef_dir, &posecef),
        (clock_dir, &clock),
        (dop_dir, &dop),
    ] {
        if listing.len() != pvt.len() {
            return Err(Error::GroupCountMismatch {
                group,
                expected: pvt.len(),
                found: listing.len(),
            });
        }
    }

    let mut bundle = solution_bundle();
    for (index, (p, e, c, d)) in izip!(&pvt, &posecef, &clock, &dop).enumerate() {
        for (group, other) in [(posecef_dir, e), (clock_dir, c), (dop_dir, d)] {
            if other.0 != p.0 {
                return Err(Error::GroupStampMismatch {
                    group,
                    index,
                    expected: file_stem(&p.1),
                    found: file_stem(&other.1),
                });
            }
        }

        let pvt_record = PvtEpoch::read(&p.1)?;
        let posecef_record = PosecefEpoch::read(&e.1)?;
        let clock_record = ClockEpoch::read(&c.1)?;
        let dop_record = DopEpoch::read(&d.1)?;

        bundle.push_scalar("recordTime", Value::String(pvt_record.start_time));
        bundle.push_scalar("numSV", pvt_record.num_sv);
        bundle.push_scalar("nano", pvt_record.nano);
        bundle.push_scalar("lon", pvt_record.lon);
        bundle.push_scalar("lat", pvt_record.lat);
        bundle.push_scalar("height", pvt_record.height);
        bundle.push_scalar("velN", pvt_record.vel_n);
        bundle.push_scalar("velE", pvt_record.vel_e);
        bundle.push_scalar("velD", pvt_record.vel_d);
        bundle.push_scalar("hMSL", pvt_record.h_msl);
        bundle.push_scalar("hAcc", pvt_record.h_acc);
        bundle.push_scalar("vAcc", pvt_record.v_acc);
        bundle.push_scalar("sAcc", pvt_record.s_acc);
        bundle.push_scalar("gSpeed", pvt_record.g_speed);
        bundle.push_scalar("headMot", pvt_record.head_mot);
        bundle.push_scalar("headAcc", pvt_record.head_acc);
        bundle.push_scalar("ecefX", posecef_record.ecef_x);
        bundle.push_scalar("ecefY", posecef_record.ecef_y);
        bundle.push_scalar("ecefZ", posecef_record.ecef_z);
        bundle.push_scalar("clkB", clock_record.clk_b);
        bundle.push_scalar("clkD", clock_record.clk_d);
        bundle.push_scalar("tAcc", clock_record.t_acc);
        bundle.push_scalar("fAcc", clock_record.f_acc);
        bundle.push_scalar("gDOP", dop_record.g_dop);
        bundle.push_scalar("pDOP", dop_record.p_dop);
        bundle.push_scalar("tDOP", dop_record.t_dop);
        bundle.push_scalar("vDOP", dop_record.v_dop);
        bundle.push_scalar("hDOP", dop_record.h_dop);
        bundle.push_scalar("nDOP", dop_record.n_dop);
        bundle.push_scalar("eDOP", dop_record.e_dop);
        bundle.seal_epoch()?;
    }
    Ok(bundle)
}
