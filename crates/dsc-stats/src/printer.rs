//! Output sink for array traversal.
//!
//! [`CountingArray::print`](crate::CountingArray::print) drives an
//! [`ArrayPrinter`] through a fixed callback sequence:
//!
//! ```text
//! start_array -> d1_type -> d2_type -> start_data
//!     { d1_begin -> element* -> d1_end }*
//! finish_data -> finish_array
//! ```
//!
//! Encoders only decide what each callback writes. [`ReportBuilder`] turns
//! the sequence into serde-friendly [`ArrayReport`] values.

use serde::{Deserialize, Serialize};

/// Receives the cells of one array in traversal order.
pub trait ArrayPrinter {
    fn start_array(&mut self, name: &str);
    fn d1_type(&mut self, label: &str);
    fn d2_type(&mut self, label: &str);
    fn start_data(&mut self);
    fn d1_begin(&mut self, label: &str);
    fn element(&mut self, label: &str, count: u64);
    fn d1_end(&mut self, label: &str);
    fn finish_data(&mut self);
    fn finish_array(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementReport {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    pub label: String,
    pub elements: Vec<ElementReport>,
}

/// Printed contents of one array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayReport {
    pub name: String,
    pub d1_type: String,
    pub d2_type: String,
    pub rows: Vec<RowReport>,
}

impl ArrayReport {
    /// Flattened `(d1 label, d2 label, count)` triples in print order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.rows.iter().flat_map(|row| {
            row.elements
                .iter()
                .map(move |e| (row.label.as_str(), e.label.as_str(), e.count))
        })
    }

    /// Count recorded for `(d1, d2)`, if printed.
    pub fn cell(&self, d1: &str, d2: &str) -> Option<u64> {
        self.cells()
            .find(|&(l1, l2, _)| l1 == d1 && l2 == d2)
            .map(|(_, _, c)| c)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Collects printed arrays into [`ArrayReport`]s.
///
/// An array only becomes visible in [`reports`](Self::reports) once its
/// `finish_array` arrives.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    current: Option<ArrayReport>,
    row: Option<RowReport>,
    done: Vec<ArrayReport>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[ArrayReport] {
        &self.done
    }

    pub fn into_reports(self) -> Vec<ArrayReport> {
        self.done
    }
}

impl ArrayPrinter for ReportBuilder {
    fn start_array(&mut self, name: &str) {
        self.row = None;
        self.current = Some(ArrayReport {
            name: name.to_string(),
            ..Default::default()
        });
    }

    fn d1_type(&mut self, label: &str) {
        if let Some(report) = self.current.as_mut() {
            report.d1_type = label.to_string();
        }
    }

    fn d2_type(&mut self, label: &str) {
        if let Some(report) = self.current.as_mut() {
            report.d2_type = label.to_string();
        }
    }

    fn start_data(&mut self) {}

    fn d1_begin(&mut self, label: &str) {
        self.row = Some(RowReport {
            label: label.to_string(),
            elements: Vec::new(),
        });
    }

    fn element(&mut self, label: &str, count: u64) {
        if let Some(row) = self.row.as_mut() {
            row.elements.push(ElementReport {
                label: label.to_string(),
                count,
            });
        }
    }

    fn d1_end(&mut self, _label: &str) {
        if let (Some(row), Some(report)) = (self.row.take(), self.current.as_mut()) {
            report.rows.push(row);
        }
    }

    fn finish_data(&mut self) {}

    fn finish_array(&mut self) {
        if let Some(report) = self.current.take() {
            self.done.push(report);
        }
    }
}
