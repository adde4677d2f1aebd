//! The hourly series bundle: every series a unit's document will carry,
//! accumulated epoch by epoch.
//!
//! All series are declared before the first epoch is folded; each epoch
//! must append to every series exactly once and is then sealed. That makes
//! the equal-length contract the writer and the plotting side rely on hold
//! by construction instead of by convention.

use std::collections::HashMap;

use ndarray::Array2;
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    extract::DenseRow,
};

/// Marks "no data" in the used-flag, quality-indicator and health series,
/// where an honest zero would be ambiguous. Valid input never holds exactly
/// this value in those fields; that collision risk is documented, not
/// prevented.
pub const ABSENT_SENTINEL: f64 = 0.11;

#[derive(Debug)]
enum Column {
    /// Per-epoch scalars carried verbatim from the input records.
    Scalar(Vec<Value>),
    /// Per-epoch dense rows over satellite slots; absent slots take `fill`
    /// when the bundle is lowered to a document.
    Rows { fill: f64, rows: Array2<Option<f64>> },
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Scalar(values) => values.len(),
            Column::Rows { rows, .. } => rows.nrows(),
        }
    }
}

#[derive(Debug)]
pub struct SeriesBundle {
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    sealed_epochs: usize,
}

impl SeriesBundle {
    pub fn new() -> SeriesBundle {
        SeriesBundle {
            names: Vec::new(),
            columns: Vec::new(),
            index: HashMap::new(),
            sealed_epochs: 0,
        }
    }

    /// The number of sealed epochs, T.
    pub fn epochs(&self) -> usize {
        self.sealed_epochs
    }

    pub fn declare_scalar(&mut self, name: &str) {
        self.declare(name, Column::Scalar(Vec::new()));
    }

    pub fn declare_rows(&mut self, name: &str, width: usize, fill: f64) {
        self.declare(
            name,
            Column::Rows {
                fill,
                rows: Array2::from_elem((0, width), None),
            },
        );
    }

    fn declare(&mut self, name: &str, column: Column) {
        assert!(
            self.index
                .insert(name.to_string(), self.columns.len())
                .is_none(),
            "series {name} declared twice"
        );
        self.names.push(name.to_string());
        self.columns.push(column);
    }

    fn column_mut(&mut self, name: &str) -> &mut Column {
        let i = *self
            .index
            .get(name)
            .unwrap_or_else(|| panic!("series {name} was never declared"));
        &mut self.columns[i]
    }

    pub fn push_scalar(&mut self, name: &str, value: Value) {
        match self.column_mut(name) {
            Column::Scalar(values) => values.push(value),
            Column::Rows { .. } => panic!("series {name} holds rows, not scalars"),
        }
    }

    pub fn push_row(&mut self, name: &str, row: DenseRow) {
        match self.column_mut(name) {
            Column::Rows { rows, .. } => rows
                .push_row(row.slots())
                .expect("row width matches the declared series width"),
            Column::Scalar(_) => panic!("series {name} holds scalars, not rows"),
        }
    }

    /// Close out one epoch: every series must have grown by exactly one
    /// entry since the last seal.
    pub fn seal_epoch(&mut self) -> Result<()> {
        let expected = self.sealed_epochs + 1;
        for (name, column) in self.names.iter().zip(&self.columns) {
            if column.len() != expected {
                return Err(Error::RaggedBundle {
                    name: name.clone(),
                    len: column.len(),
                    expected,
                });
            }
        }
        self.sealed_epochs = expected;
        Ok(())
    }

    /// Lower the bundle to its document mapping, applying each row series'
    /// fill. This is the only place absence becomes a concrete number.
    pub fn into_document(self) -> Map<String, Value> {
        let mut document = Map::with_capacity(self.names.len());
        for (name, column) in self.names.into_iter().zip(self.columns) {
            let value = match column {
                Column::Scalar(values) => Value::Array(values),
                Column::Rows { fill, rows } => Value::Array(
                    rows.outer_iter()
                        .map(|row| {
                            Value::Array(
                                row.iter().map(|slot| slot.unwrap_or(fill).into()).collect(),
                            )
                        })
                        .collect(),
                ),
            };
            document.insert(name, value);
        }
        document
    }
}

impl Default for SeriesBundle {
    fn default() -> Self {
        SeriesBundle::new()
    }
}
