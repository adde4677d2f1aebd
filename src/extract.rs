//! Per-constellation extraction: scatter one epoch's sparse measurements
//! into dense fixed-width rows, one slot per satellite.

use std::path::Path;

use ndarray::{Array1, ArrayView1};

use crate::{
    constellation::{Constellation, Slot},
    error::{Error, Result},
    read::{indexed_key, observation::RawxEpoch, tracking::NavSatEpoch},
};

/// One quantity for one epoch across all satellite slots of a
/// constellation.
///
/// Slots are `None` until written; the zero/sentinel fill is applied only
/// when the owning bundle is lowered to a document. Writes routed to the
/// discard slot land in a scratch cell that is dropped at hand-off, so an
/// out-of-range satellite id never reaches a retained slot.
#[derive(Debug, Clone)]
pub struct DenseRow {
    slots: Array1<Option<f64>>,
    scratch: Option<f64>,
}

impl DenseRow {
    pub fn new(width: usize) -> DenseRow {
        DenseRow {
            slots: Array1::from_elem(width, None),
            scratch: None,
        }
    }

    pub fn set(&mut self, slot: Slot, value: f64) {
        match slot {
            Slot::Valid(i) => self.slots[i] = Some(value),
            Slot::Discard => self.scratch = Some(value),
        }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<f64> {
        self.slots[slot]
    }

    /// What the discard slot last absorbed. Retained nowhere in output.
    pub fn scratch(&self) -> Option<f64> {
        self.scratch
    }

    pub(crate) fn slots(&self) -> ArrayView1<Option<f64>> {
        self.slots.view()
    }
}

/// The seven observed quantities of one signal band.
#[derive(Debug)]
pub struct ObsBandRows {
    pub pr_mes: DenseRow,
    pub do_mes: DenseRow,
    pub cp_mes: DenseRow,
    pub cn0: DenseRow,
    pub pr_std: DenseRow,
    pub cp_std: DenseRow,
    pub do_std: DenseRow,
}

impl ObsBandRows {
    fn new(width: usize) -> ObsBandRows {
        ObsBandRows {
            pr_mes: DenseRow::new(width),
            do_mes: DenseRow::new(width),
            cp_mes: DenseRow::new(width),
            cn0: DenseRow::new(width),
            pr_std: DenseRow::new(width),
            cp_std: DenseRow::new(width),
            do_std: DenseRow::new(width),
        }
    }

    /// The rows paired with their series-key prefixes, in document order.
    pub fn into_named(self) -> [(&'static str, DenseRow); 7] {
        [
            ("prMes", self.pr_mes),
            ("doMes", self.do_mes),
            ("cpMes", self.cp_mes),
            ("cn0", self.cn0),
            ("prStd", self.pr_std),
            ("cpStd", self.cp_std),
            ("doStd", self.do_std),
        ]
    }
}

/// Everything one observation epoch contributes for one constellation:
/// seven quantities on each of two bands, plus the visible-satellite row.
#[derive(Debug)]
pub struct ObservationRows {
    pub visible: DenseRow,
    pub band1: ObsBandRows,
    pub band2: ObsBandRows,
}

/// Scatter one observation epoch's measurements for `target`.
///
/// Band 1 is sigId 0, band 2 the constellation's configured second band;
/// any other sigId still marks the satellite visible but contributes no
/// quantities. A quantity missing on a band that *is* extracted names the
/// exact templated field in the error.
pub fn extract_observation(epoch: &RawxEpoch, target: Constellation) -> Result<ObservationRows> {
    let width = target.capacity();
    let mut rows = ObservationRows {
        visible: DenseRow::new(width),
        band1: ObsBandRows::new(width),
        band2: ObsBandRows::new(width),
    };

    for m in &epoch.measurements {
        if m.constellation != target {
            continue;
        }
        let slot = target.slot(m.sv_id);
        rows.visible.set(slot, f64::from(m.sv_id));

        let band = if m.sig_id == 0 {
            &mut rows.band1
        } else if m.sig_id == target.second_band_sig_id() {
            &mut rows.band2
        } else {
            continue;
        };
        band.cn0.set(slot, need(&epoch.path, "cno", m.index, m.cno)?);
        band.pr_mes
            .set(slot, need(&epoch.path, "prMes", m.index, m.pr_mes)?);
        band.cp_mes
            .set(slot, need(&epoch.path, "cpMes", m.index, m.cp_mes)?);
        band.do_mes
            .set(slot, need(&epoch.path, "doMes", m.index, m.do_mes)?);
        band.pr_std
            .set(slot, need(&epoch.path, "prStd", m.index, m.pr_std)?);
        band.cp_std
            .set(slot, need(&epoch.path, "cpStd", m.index, m.cp_std)?);
        band.do_std
            .set(slot, need(&epoch.path, "doStd", m.index, m.do_std)?);
    }

    Ok(rows)
}

fn need(path: &Path, base: &str, index: usize, value: Option<f64>) -> Result<f64> {
    value.ok_or_else(|| Error::MissingField {
        path: path.to_path_buf(),
        field: indexed_key(base, index),
    })
}

/// Everything one tracking epoch contributes for one constellation.
///
/// The used/quality/health rows read as the absence sentinel for every
/// untouched slot once the bundle applies its fills; the remaining rows
/// read as zero.
#[derive(Debug)]
pub struct TrackingRows {
    pub sv_id: DenseRow,
    pub used: DenseRow,
    pub cno: DenseRow,
    pub elev: DenseRow,
    pub azim: DenseRow,
    pub pr_res: DenseRow,
    pub quality_ind: DenseRow,
    pub health: DenseRow,
}

impl TrackingRows {
    /// The rows paired with their series-key prefixes, in document order.
    pub fn into_named(self) -> [(&'static str, DenseRow); 8] {
        [
            ("svId", self.sv_id),
            ("svUsed", self.used),
            ("cno", self.cno),
            ("elev", self.elev),
            ("azim", self.azim),
            ("prRes", self.pr_res),
            ("qualityInd", self.quality_ind),
            ("health", self.health),
        ]
    }
}

/// Scatter one tracking epoch's entries for `target`. Never fails: the
/// reader already required every field of a supported entry.
pub fn extract_tracking(epoch: &NavSatEpoch, target: Constellation) -> TrackingRows {
    let width = target.capacity();
    let mut rows = TrackingRows {
        sv_id: DenseRow::new(width),
        used: DenseRow::new(width),
        cno: DenseRow::new(width),
        elev: DenseRow::new(width),
        azim: DenseRow::new(width),
        pr_res: DenseRow::new(width),
        quality_ind: DenseRow::new(width),
        health: DenseRow::new(width),
    };

    for entry in &epoch.entries {
        if entry.constellation != target {
            continue;
        }
        let slot = target.slot(entry.sv_id);
        rows.sv_id.set(slot, f64::from(entry.sv_id));
        rows.used.set(slot, entry.used);
        rows.cno.set(slot, entry.cno);
        rows.elev.set(slot, entry.elev);
        rows.azim.set(slot, entry.azim);
        rows.pr_res.set(slot, entry.pr_res);
        rows.quality_ind.set(slot, entry.quality_ind);
        rows.health.set(slot, entry.health);
    }

    rows
}
