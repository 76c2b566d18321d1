//! CSV persistence for extracted study data.
//!
//! A saved study is a pair of files, `<prefix>_cf.csv` and `<prefix>_ecg.csv`.
//! Each row is `index,point,trace,s0,s1,…`: the zero-based point ordinal,
//! the point id in `<map>_P<point>` form, the trace name (a contact-force
//! column or an ECG channel), then one field per sample. The ordinal keys the
//! rows — merged studies may legitimately contain two points with the same
//! id, and those must survive a save/load cycle. Saved studies load back
//! into [`StudyData`] and can be merged into combined files.

use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array2, Array3};

use crate::error::{ExportError, Result};
use crate::types::{PointId, StudyData};

/// Paths of one saved study.
#[derive(Debug, Clone)]
pub struct StudyFiles {
    pub contact_force: PathBuf,
    pub ecg: PathBuf,
}

impl StudyFiles {
    /// The `<prefix>_cf.csv` / `<prefix>_ecg.csv` pair for a prefix.
    pub fn with_prefix<P: AsRef<Path>>(prefix: P) -> Self {
        let prefix = prefix.as_ref();
        StudyFiles {
            contact_force: suffixed(prefix, "_cf.csv"),
            ecg: suffixed(prefix, "_ecg.csv"),
        }
    }
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    prefix.with_file_name(name)
}

/// Saves a study as a CSV pair and returns the written paths.
pub fn save_study<P: AsRef<Path>>(prefix: P, study: &StudyData) -> Result<StudyFiles> {
    let files = StudyFiles::with_prefix(prefix);
    write_block(
        &files.contact_force,
        &study.points,
        &study.cf_traces,
        &study.contact_force,
    )?;
    write_block(&files.ecg, &study.points, &study.ecg_channels, &study.ecg)?;
    info!(
        "saved {} points to {} and {}",
        study.len(),
        files.contact_force.display(),
        files.ecg.display()
    );
    Ok(files)
}

/// Writes a named set of traces for a single point or extraction.
///
/// Rows are `trace,s0,s1,…` with one row per trace; `data` is shaped
/// `(traces, samples)`.
pub fn write_traces<P: AsRef<Path>>(path: P, names: &[&str], data: &Array2<f64>) -> Result<()> {
    if names.len() != data.nrows() {
        return Err(ExportError::ShapeMismatch(format!(
            "{} trace names for {} rows",
            names.len(),
            data.nrows()
        )));
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    for (name, row) in names.iter().zip(data.rows()) {
        let mut record = vec![name.to_string()];
        record.extend(row.iter().map(|v| format_sample(*v)));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

fn write_block(
    path: &Path,
    points: &[PointId],
    traces: &[String],
    data: &Array3<f64>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for (p, point) in points.iter().enumerate() {
        for (t, trace) in traces.iter().enumerate() {
            let mut record = vec![p.to_string(), point.to_string(), trace.clone()];
            record.extend(
                data.slice(ndarray::s![p, t, ..])
                    .iter()
                    .map(|v| format_sample(*v)),
            );
            writer.write_record(&record)?;
        }
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

/// Integral samples print without a trailing `.0` so ECG amplitudes stay
/// byte-identical to the source export.
fn format_sample(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Loads a saved study from its CSV pair.
pub fn load_study(files: &StudyFiles) -> Result<StudyData> {
    let (cf_points, cf_traces, contact_force) = read_block(&files.contact_force)?;
    let (ecg_points, ecg_channels, ecg) = read_block(&files.ecg)?;

    if cf_points != ecg_points {
        return Err(ExportError::ShapeMismatch(format!(
            "contact-force file has {} points, ECG file has {}",
            cf_points.len(),
            ecg_points.len()
        )));
    }

    Ok(StudyData {
        points: cf_points,
        contact_force,
        ecg,
        cf_traces,
        ecg_channels,
    })
}

fn read_block(path: &Path) -> Result<(Vec<PointId>, Vec<String>, Array3<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut points: Vec<PointId> = Vec::new();
    let mut traces: Vec<String> = Vec::new();
    let mut samples = 0usize;
    let mut values: Vec<f64> = Vec::new();
    let mut row_in_point = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 4 {
            return Err(ExportError::InvalidFormat(format!(
                "CSV row {row} has {} fields, expected at least 4",
                record.len()
            )));
        }
        let ordinal: usize = record[0].parse().map_err(|_| {
            ExportError::InvalidFormat(format!(
                "CSV row {row}: invalid point index {:?}",
                &record[0]
            ))
        })?;
        let point = PointId::parse(&record[1])?;
        let trace = record[2].to_string();

        // The leading ordinal keys the point, not the id: merged studies can
        // hold several points with the same id back to back.
        if ordinal == points.len() {
            if !points.is_empty() && row_in_point != traces.len() {
                return Err(ExportError::InvalidFormat(format!(
                    "point {} has {} traces, expected {}",
                    points.last().unwrap(),
                    row_in_point,
                    traces.len()
                )));
            }
            points.push(point);
            row_in_point = 0;
        } else if ordinal + 1 != points.len() {
            return Err(ExportError::InvalidFormat(format!(
                "CSV row {row}: point index {ordinal} out of order"
            )));
        } else if points.last() != Some(&point) {
            return Err(ExportError::InvalidFormat(format!(
                "CSV row {row}: point id changed within index {ordinal}"
            )));
        }

        if points.len() == 1 {
            traces.push(trace);
        } else if traces.get(row_in_point).map(String::as_str) != Some(trace.as_str()) {
            return Err(ExportError::InvalidFormat(format!(
                "CSV row {row}: unexpected trace {trace:?}"
            )));
        }
        row_in_point += 1;

        let row_samples = record.len() - 3;
        if samples == 0 {
            samples = row_samples;
        } else if row_samples != samples {
            return Err(ExportError::InvalidFormat(format!(
                "CSV row {row} has {row_samples} samples, expected {samples}"
            )));
        }
        for field in record.iter().skip(3) {
            values.push(field.parse().map_err(|_| ExportError::InvalidNumber {
                row,
                value: field.to_string(),
            })?);
        }
    }

    if !points.is_empty() && row_in_point != traces.len() {
        return Err(ExportError::InvalidFormat(format!(
            "point {} has {} traces, expected {}",
            points.last().unwrap(),
            row_in_point,
            traces.len()
        )));
    }

    let data = Array3::from_shape_vec((points.len(), traces.len(), samples), values)
        .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
    Ok((points, traces, data))
}

/// Loads every saved study and writes one merged pair under `prefix`.
///
/// Returns the merged study.
pub fn merge_files(inputs: &[StudyFiles], prefix: &Path) -> Result<StudyData> {
    let mut merged: Option<StudyData> = None;
    for files in inputs {
        let study = load_study(files)?;
        match merged.as_mut() {
            Some(merged) => merged.merge(&study)?,
            None => merged = Some(study),
        }
    }
    let merged = merged.ok_or_else(|| {
        ExportError::InvalidFormat("no input studies to merge".to_string())
    })?;
    save_study(prefix, &merged)?;
    info!("merged {} studies into {} points", inputs.len(), merged.len());
    Ok(merged)
}
