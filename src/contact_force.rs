use std::fs;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};

use crate::error::{ExportError, Result};
use crate::utils::{clean_lines, parse_row};

/// Number of header lines before the sample rows. The header content varies
/// between export versions and is not interpreted.
pub const HEADER_LINES: usize = 8;

/// Column layout of a contact-force data row.
pub const COLUMN_NAMES: [&str; 9] = [
    "Index",
    "Time",
    "TimeStamp",
    "ForceValue",
    "AxialAngle",
    "LateralAngle",
    "MetalSeverity",
    "InAccurateSeverity",
    "NeedZeroing",
];

/// Default extracted columns: force value, axial angle, lateral angle.
pub const DEFAULT_COLUMNS: [usize; 3] = [3, 4, 5];

/// Default sample window. Positive time values start after sample 150; files
/// nominally hold 200 samples but occasionally 201, so the window is capped
/// at 50 samples rather than running to the end of the file.
pub const DEFAULT_WINDOW_START: usize = 150;
pub const DEFAULT_WINDOW_LEN: usize = 50;

/// Reader for CARTO `*_ContactForce.txt` files.
///
/// A contact-force export carries a fixed-size header followed by one row of
/// numeric readings per sample (index, relative time, timestamp, force value,
/// axial angle, lateral angle and three severity flags).
///
/// ```rust
/// use cartoexport::contact_force::{ContactForceExport, DEFAULT_COLUMNS};
///
/// let mut text = String::new();
/// for _ in 0..8 {
///     text.push_str("header\n");
/// }
/// for i in 0..200 {
///     text.push_str(&format!("{i} {t} 1000 12.5 30.0 -14.0 0 0 0\n", t = i as f64 - 150.0));
/// }
///
/// let export = ContactForceExport::parse(&text)?;
/// assert_eq!(export.samples(), 200);
///
/// let window = export.window(&DEFAULT_COLUMNS, 150, 50)?;
/// assert_eq!(window.shape(), &[3, 50]);
/// assert_eq!(window[[0, 0]], 12.5);
/// # Ok::<(), cartoexport::ExportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ContactForceExport {
    /// Readings shaped `(samples, columns)`, in file order.
    data: Array2<f64>,
}

impl ContactForceExport {
    /// Opens and parses a contact-force export file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path).map_err(|e| {
            ExportError::FileNotFound(format!("{}: {}", path.as_ref().display(), e))
        })?;
        debug!("parsing contact-force export {}", path.as_ref().display());
        Self::parse(&text)
    }

    /// Parses a contact-force export from text.
    pub fn parse(text: &str) -> Result<Self> {
        let lines = clean_lines(text);
        if lines.len() < HEADER_LINES + 1 {
            return Err(ExportError::TruncatedFile {
                expected: HEADER_LINES + 1,
                found: lines.len(),
            });
        }

        let mut values = Vec::new();
        let mut width = 0usize;
        let mut samples = 0usize;
        for (row, line) in lines[HEADER_LINES..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<f64> = parse_row(line, row)?;
            if samples == 0 {
                width = fields.len();
            } else if fields.len() != width {
                return Err(ExportError::InvalidFormat(format!(
                    "data row {} has {} values, expected {}",
                    row,
                    fields.len(),
                    width
                )));
            }
            values.extend_from_slice(&fields);
            samples += 1;
        }

        if samples == 0 {
            return Err(ExportError::InvalidFormat(
                "contact-force export has no data rows".to_string(),
            ));
        }

        let data = Array2::from_shape_vec((samples, width), values)
            .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
        Ok(ContactForceExport { data })
    }

    /// Number of sample rows in the export.
    pub fn samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns per row (nominally 9).
    pub fn columns(&self) -> usize {
        self.data.ncols()
    }

    /// Full series of one column.
    pub fn column(&self, index: usize) -> Result<Array1<f64>> {
        if index >= self.columns() {
            return Err(ExportError::ColumnOutOfRange(index, self.columns()));
        }
        Ok(self.data.column(index).to_owned())
    }

    /// Extracts `columns` over the sample window `start..start+len`.
    ///
    /// The result is shaped `(columns, len)` with rows in request order.
    /// A window reaching past the last sample is an error.
    pub fn window(&self, columns: &[usize], start: usize, len: usize) -> Result<Array2<f64>> {
        for &col in columns {
            if col >= self.columns() {
                return Err(ExportError::ColumnOutOfRange(col, self.columns()));
            }
        }

        let available = self.samples();
        let end = start.checked_add(len).unwrap_or(usize::MAX);
        if end > available {
            return Err(ExportError::SampleRangeOutOfBounds {
                start,
                end,
                available,
            });
        }

        let mut out = Array2::zeros((columns.len(), len));
        for (row, &col) in columns.iter().enumerate() {
            for (i, sample) in (start..end).enumerate() {
                out[[row, i]] = self.data[[sample, col]];
            }
        }
        Ok(out)
    }

    /// Force value, axial angle and lateral angle over the positive-time
    /// window (samples 150..200).
    pub fn default_window(&self) -> Result<Array2<f64>> {
        self.window(&DEFAULT_COLUMNS, DEFAULT_WINDOW_START, DEFAULT_WINDOW_LEN)
    }
}
