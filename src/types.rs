use chrono::NaiveDateTime;
use ndarray::{concatenate, Array3, Axis};

use crate::error::{ExportError, Result};
use crate::utils::{parse_export_stem, strip_channel_label};

/// A channel label from an ECG export header row.
///
/// The export writes labels as a name followed by a parenthesized channel
/// number (`M1-M2(30)`); channel lookup is by the bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLabel {
    /// Label exactly as written in the header row.
    pub raw: String,
    /// Bare channel name with the parenthesized number stripped.
    pub name: String,
    /// Channel number from the parenthesized suffix, when present.
    pub number: Option<u32>,
}

impl ChannelLabel {
    pub fn parse(raw: &str) -> Self {
        let (name, number) = strip_channel_label(raw);
        ChannelLabel {
            raw: raw.to_string(),
            name: name.to_string(),
            number,
        }
    }
}

/// Metadata from the first three lines of an ECG export.
#[derive(Debug, Clone)]
pub struct EcgMetadata {
    /// Format tag from the first line, e.g. `ECG_Export_4.0`.
    pub format_tag: String,
    /// Amplitude gain: millivolts per digital unit.
    pub gain: f64,
    pub unipolar_channel: Option<String>,
    pub bipolar_channel: Option<String>,
    pub reference_channel: Option<String>,
}

/// Identifies one acquired point within a mapping study.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PointId {
    /// Map name, e.g. `1-SR`.
    pub map: String,
    /// Point number within the map, e.g. `1181`.
    pub point: String,
}

impl PointId {
    pub fn new(map: &str, point: &str) -> Self {
        PointId {
            map: map.to_string(),
            point: point.to_string(),
        }
    }

    pub fn contact_force_filename(&self) -> String {
        format!("{}_P{}_ContactForce.txt", self.map, self.point)
    }

    pub fn ecg_filename(&self) -> String {
        format!("{}_P{}_ECG_Export.txt", self.map, self.point)
    }

    /// Parses the `<map>_P<point>` form used in saved study CSV files.
    pub fn parse(s: &str) -> Result<Self> {
        let pos = s
            .rfind("_P")
            .ok_or_else(|| ExportError::InvalidFormat(format!("bad point id: {s:?}")))?;
        Ok(PointId::new(&s[..pos], &s[pos + 2..]))
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_P{}", self.map, self.point)
    }
}

/// Study identifier and export timestamp parsed from an archive stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStem {
    pub study: String,
    pub exported_at: NaiveDateTime,
}

impl ExportStem {
    /// Parses a stem such as `Export_2021E150-04_08_2021-14-49-19`.
    pub fn parse(stem: &str) -> Option<Self> {
        let (study, exported_at) = parse_export_stem(stem)?;
        Some(ExportStem { study, exported_at })
    }
}

/// Extracted traces for a whole study: one contact-force block and one ECG
/// block, aligned by point.
///
/// Shapes are `(points, traces, samples)`. With the default load options the
/// contact-force block is `(n, 3, 50)` (force, axial angle, lateral angle
/// over the positive-time window) and the ECG block is `(n, 6, 2500)` (the
/// six mapping channels).
#[derive(Debug, Clone)]
pub struct StudyData {
    pub points: Vec<PointId>,
    pub contact_force: Array3<f64>,
    pub ecg: Array3<f64>,
    /// Names of the contact-force traces, e.g. `ForceValue`.
    pub cf_traces: Vec<String>,
    /// Names of the extracted ECG channels, e.g. `M1-M2`.
    pub ecg_channels: Vec<String>,
}

impl StudyData {
    /// Number of points in the study.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends another study's points to this one.
    ///
    /// Both studies must carry the same traces and sample counts.
    pub fn merge(&mut self, other: &StudyData) -> Result<()> {
        if self.cf_traces != other.cf_traces || self.ecg_channels != other.ecg_channels {
            return Err(ExportError::ShapeMismatch(
                "cannot merge studies with different trace sets".to_string(),
            ));
        }
        if self.contact_force.shape()[1..] != other.contact_force.shape()[1..]
            || self.ecg.shape()[1..] != other.ecg.shape()[1..]
        {
            return Err(ExportError::ShapeMismatch(format!(
                "cannot merge studies with different sample shapes: {:?} vs {:?}",
                self.ecg.shape(),
                other.ecg.shape()
            )));
        }

        self.contact_force = concatenate(
            Axis(0),
            &[self.contact_force.view(), other.contact_force.view()],
        )
        .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
        self.ecg = concatenate(Axis(0), &[self.ecg.view(), other.ecg.view()])
            .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
        self.points.extend(other.points.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_roundtrip() {
        let id = PointId::new("1-SR", "1181");
        assert_eq!(id.to_string(), "1-SR_P1181");
        assert_eq!(PointId::parse("1-SR_P1181").unwrap(), id);
        assert_eq!(id.ecg_filename(), "1-SR_P1181_ECG_Export.txt");
        assert_eq!(id.contact_force_filename(), "1-SR_P1181_ContactForce.txt");
    }

    #[test]
    fn test_point_id_with_underscored_map() {
        // Map names may themselves contain "_P"; the last occurrence wins.
        let id = PointId::parse("RE_PVI_map_P33").unwrap();
        assert_eq!(id.map, "RE_PVI_map");
        assert_eq!(id.point, "33");
    }

    #[test]
    fn test_channel_label_parse() {
        let label = ChannelLabel::parse("M3-M4(32)");
        assert_eq!(label.name, "M3-M4");
        assert_eq!(label.number, Some(32));
        assert_eq!(label.raw, "M3-M4(32)");
    }
}
