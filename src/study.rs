use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::Array3;

use crate::contact_force::{
    ContactForceExport, COLUMN_NAMES, DEFAULT_COLUMNS, DEFAULT_WINDOW_LEN, DEFAULT_WINDOW_START,
};
use crate::ecg::EcgExport;
use crate::error::{ExportError, Result};
use crate::types::{PointId, StudyData};
use crate::utils::{parse_point_filename, PointFileKind};
use crate::{ECG_SAMPLES, MAPPING_CHANNELS};

/// Export file pair for one acquired point.
#[derive(Debug, Clone)]
pub struct PointFiles {
    pub id: PointId,
    pub contact_force: PathBuf,
    pub ecg: PathBuf,
}

/// What to extract from each point when loading a study.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Contact-force columns to keep (defaults to force and both angles).
    pub cf_columns: Vec<usize>,
    /// Contact-force window start sample.
    pub cf_start: usize,
    /// Contact-force window length.
    pub cf_len: usize,
    /// ECG channels to extract, by bare name.
    pub channels: Vec<String>,
    /// ECG samples per point (the window always starts at sample 0).
    pub ecg_samples: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            cf_columns: DEFAULT_COLUMNS.to_vec(),
            cf_start: DEFAULT_WINDOW_START,
            cf_len: DEFAULT_WINDOW_LEN,
            channels: MAPPING_CHANNELS.iter().map(|c| c.to_string()).collect(),
            ecg_samples: ECG_SAMPLES,
        }
    }
}

/// Scans a study directory for contact-force exports with a matching ECG
/// export.
///
/// Files follow the `<map>_P<point>_ContactForce.txt` /
/// `<map>_P<point>_ECG_Export.txt` convention. Contact-force files without a
/// sibling ECG export are logged and skipped. Results are sorted by filename
/// so repeated scans are deterministic; `limit` caps the number of pairs.
pub fn scan_pairs(dir: &Path, limit: Option<usize>) -> Result<Vec<PointFiles>> {
    let mut cf_files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let filename = entry.file_name();
        let Some(filename) = filename.to_str() else {
            continue;
        };
        if let Some((map, point, PointFileKind::ContactForce)) = parse_point_filename(filename) {
            cf_files.push((PointId::new(map, point), entry.path()));
        }
    }
    cf_files.sort_by(|a, b| a.1.cmp(&b.1));

    let mut pairs = Vec::new();
    for (id, cf_path) in cf_files {
        if let Some(limit) = limit {
            if pairs.len() >= limit {
                break;
            }
        }
        let ecg_path = dir.join(id.ecg_filename());
        if ecg_path.is_file() {
            pairs.push(PointFiles {
                id,
                contact_force: cf_path,
                ecg: ecg_path,
            });
        } else {
            warn!("no ECG export found for {}", cf_path.display());
        }
    }

    info!(
        "{} contact-force files with corresponding ECG exports found in {} (limit {:?})",
        pairs.len(),
        dir.display(),
        limit
    );
    Ok(pairs)
}

/// Loads every point pair into one [`StudyData`] block.
///
/// Each point contributes one contact-force window shaped
/// `(cf_columns, cf_len)` and one ECG block shaped
/// `(channels, ecg_samples)`; points are stacked along the first axis.
pub fn load_study(pairs: &[PointFiles], options: &LoadOptions) -> Result<StudyData> {
    let channel_refs: Vec<&str> = options.channels.iter().map(String::as_str).collect();

    let mut points = Vec::with_capacity(pairs.len());
    let mut cf_values = Vec::new();
    let mut ecg_values = Vec::new();

    for pair in pairs {
        let cf = ContactForceExport::open(&pair.contact_force)?;
        let window = cf.window(&options.cf_columns, options.cf_start, options.cf_len)?;
        cf_values.extend(window.iter().copied());

        let ecg = EcgExport::open(&pair.ecg)?;
        let traces = ecg.extract(&channel_refs, 0, Some(options.ecg_samples))?;
        ecg_values.extend(traces.iter().map(|&v| v as f64));

        points.push(pair.id.clone());
    }

    let contact_force = Array3::from_shape_vec(
        (points.len(), options.cf_columns.len(), options.cf_len),
        cf_values,
    )
    .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
    let ecg = Array3::from_shape_vec(
        (points.len(), options.channels.len(), options.ecg_samples),
        ecg_values,
    )
    .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;

    info!("loaded {} points", points.len());

    let cf_traces = options
        .cf_columns
        .iter()
        .map(|&col| {
            COLUMN_NAMES
                .get(col)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("Column{col}"))
        })
        .collect();

    Ok(StudyData {
        points,
        contact_force,
        ecg,
        cf_traces,
        ecg_channels: options.channels.clone(),
    })
}

/// Scans `dir` and loads every paired point in one call.
pub fn load_dir(dir: &Path, limit: Option<usize>, options: &LoadOptions) -> Result<StudyData> {
    let pairs = scan_pairs(dir, limit)?;
    load_study(&pairs, options)
}
