use std::fs;
use std::path::Path;

use log::debug;
use ndarray::Array2;

use crate::error::{ExportError, Result};
use crate::utils::{clean_lines, parse_delimited_row};

/// Per-channel metadata from an EP-system export header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpChannelInfo {
    pub number: usize,
    pub label: String,
    pub range: String,
    pub low: String,
    pub high: String,
    pub sample_rate: String,
}

/// Header of an EP-system export: a `[Header]` section of `Key : Value`
/// lines with `Channel #<n>` blocks for per-channel metadata.
#[derive(Debug, Clone, Default)]
pub struct EpHeader {
    pub file_type: String,
    pub version: String,
    pub channels_exported: usize,
    pub samples_per_channel: usize,
    pub start_time: String,
    pub end_time: String,
    pub data_format: String,
    pub sample_rate: String,
    pub channels: Vec<EpChannelInfo>,
}

impl EpHeader {
    /// Metadata of the channel with the given label.
    pub fn channel_by_label(&self, label: &str) -> Option<&EpChannelInfo> {
        self.channels.iter().find(|c| c.label == label)
    }
}

/// Reader for EP-system recording exports.
///
/// Unlike the CARTO exports these files carry an INI-like `[Header]` section
/// followed by a `[Data]` marker and comma-separated integer rows.
///
/// ```rust
/// use cartoexport::EpExport;
///
/// let text = "\
/// [Header]
/// File Type : 1
/// Version : 5
/// Channels exported : 3
/// Samples per channel : 4
/// Start time : 10:30:00
/// End time : 10:30:10
/// Data Format : short
/// Sample Rate : 1000Hz
/// Channel # : 1
/// Label : I
/// Range : 5mv
/// Channel # : 2
/// Label : II
/// Channel # : 3
/// Label : V1
/// [Data]
/// 1,2,3
/// 4,5,6
/// 7,8,9
/// 10,11,12
/// ";
///
/// let export = EpExport::parse(text)?;
/// assert_eq!(export.header().channels_exported, 3);
/// assert_eq!(export.header().channel_by_label("II").unwrap().number, 2);
///
/// // Channels are rows, samples are columns.
/// let channels = export.channels();
/// assert_eq!(channels.shape(), &[3, 4]);
/// assert_eq!(channels[[2, 3]], 12);
/// # Ok::<(), cartoexport::ExportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EpExport {
    header: EpHeader,
    /// Amplitudes shaped `(samples, channels)`, in file order.
    data: Array2<i32>,
}

impl EpExport {
    /// Opens and parses an EP export file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_limit(path, None)
    }

    /// Opens and parses an EP export, keeping at most `limit` samples.
    ///
    /// EP recordings can run for minutes; the limit avoids holding the whole
    /// session when only the leading window is wanted.
    pub fn open_with_limit<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Self> {
        let text = fs::read_to_string(&path).map_err(|e| {
            ExportError::FileNotFound(format!("{}: {}", path.as_ref().display(), e))
        })?;
        debug!("parsing EP export {}", path.as_ref().display());
        Self::parse_with_limit(&text, limit)
    }

    /// Parses an EP export from text.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_limit(text, None)
    }

    /// Parses an EP export, keeping at most `limit` samples.
    pub fn parse_with_limit(text: &str, limit: Option<usize>) -> Result<Self> {
        let lines = clean_lines(text);

        let mut header = EpHeader::default();
        let mut data_start = None;
        let mut current_channel: Option<usize> = None;

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed == "[Data]" {
                data_start = Some(i + 1);
                break;
            }
            if trimmed == "[Header]" || trimmed.is_empty() {
                continue;
            }

            let (key, value) = match trimmed.split_once(':') {
                Some((key, value)) => (normalize_key(key), value.trim().to_string()),
                None => continue,
            };

            if key == "channel_#" {
                let number = value.parse().map_err(|_| {
                    ExportError::InvalidFormat(format!("bad channel number {value:?}"))
                })?;
                header.channels.push(EpChannelInfo {
                    number,
                    ..EpChannelInfo::default()
                });
                current_channel = Some(header.channels.len() - 1);
                continue;
            }

            match current_channel {
                None => match key.as_str() {
                    "file_type" => header.file_type = value,
                    "version" => header.version = value,
                    "channels_exported" => {
                        header.channels_exported = parse_count(&key, &value)?
                    }
                    "samples_per_channel" => {
                        header.samples_per_channel = parse_count(&key, &value)?
                    }
                    "start_time" => header.start_time = value,
                    "end_time" => header.end_time = value,
                    "data_format" => header.data_format = value,
                    "sample_rate" => header.sample_rate = value,
                    _ => {}
                },
                Some(idx) => {
                    let channel = &mut header.channels[idx];
                    match key.as_str() {
                        "label" => channel.label = value,
                        "range" => channel.range = value,
                        "low" => channel.low = value,
                        "high" => channel.high = value,
                        "sample_rate" => channel.sample_rate = value,
                        _ => {}
                    }
                }
            }
        }

        let data_start = data_start.ok_or_else(|| {
            ExportError::InvalidFormat("no [Data] section found".to_string())
        })?;

        let mut values = Vec::new();
        let mut width = header.channels_exported;
        let mut samples = 0usize;
        for (row, line) in lines[data_start..].iter().enumerate() {
            if let Some(limit) = limit {
                if samples >= limit {
                    break;
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<i32> = parse_delimited_row(line, ',', row)?;
            if width == 0 {
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

        if header.channels_exported == 0 {
            header.channels_exported = width;
        }

        let data = Array2::from_shape_vec((samples, width), values)
            .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;
        Ok(EpExport { header, data })
    }

    pub fn header(&self) -> &EpHeader {
        &self.header
    }

    /// Number of sample rows actually parsed.
    pub fn samples(&self) -> usize {
        self.data.nrows()
    }

    /// All channels shaped `(channels, samples)`.
    pub fn channels(&self) -> Array2<i32> {
        self.data.t().to_owned()
    }

    /// Full series of the channel with the given label.
    pub fn channel(&self, label: &str) -> Result<ndarray::Array1<i32>> {
        let info = self
            .header
            .channel_by_label(label)
            .ok_or_else(|| ExportError::ChannelNotFound(label.to_string()))?;
        // Channel numbers in the header are one-based column positions.
        let column = info.number.checked_sub(1).ok_or_else(|| {
            ExportError::InvalidFormat(format!("channel {label:?} has number 0"))
        })?;
        if column >= self.data.ncols() {
            return Err(ExportError::ColumnOutOfRange(column, self.data.ncols()));
        }
        Ok(self.data.column(column).to_owned())
    }
}

/// Header keys are matched case-insensitively with spaces collapsed to
/// underscores and dots dropped, mirroring the loose formatting seen in
/// real exports.
fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('.', "")
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| ExportError::InvalidFormat(format!("bad {key} value {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[Header]
File Type : 1
Version : 5
Channels exported : 2
Samples per channel : 3
Start time : 12:00:00
End time : 12:00:30
Data Format : short
Sample Rate : 1000Hz
Channel # : 1
Label : HRA
Range : 5mv
Low : 30Hz
High : 500Hz
Sample rate : 1000Hz
Channel # : 2
Label : CS1-2
[Data]
100,200
101,201
102,202
";

    #[test]
    fn test_header_fields() {
        let export = EpExport::parse(SAMPLE).unwrap();
        let header = export.header();
        assert_eq!(header.channels_exported, 2);
        assert_eq!(header.samples_per_channel, 3);
        assert_eq!(header.sample_rate, "1000Hz");
        assert_eq!(header.channels.len(), 2);
        assert_eq!(header.channels[0].label, "HRA");
        assert_eq!(header.channels[0].low, "30Hz");
        assert_eq!(header.channel_by_label("CS1-2").unwrap().number, 2);
    }

    #[test]
    fn test_data_extraction() {
        let export = EpExport::parse(SAMPLE).unwrap();
        assert_eq!(export.samples(), 3);
        let channels = export.channels();
        assert_eq!(channels.shape(), &[2, 3]);
        assert_eq!(channels.row(1).to_vec(), vec![200, 201, 202]);
        assert_eq!(export.channel("HRA").unwrap().to_vec(), vec![100, 101, 102]);
    }

    #[test]
    fn test_sample_limit() {
        let export = EpExport::parse_with_limit(SAMPLE, Some(2)).unwrap();
        assert_eq!(export.samples(), 2);
    }

    #[test]
    fn test_missing_data_section() {
        let err = EpExport::parse("[Header]\nVersion : 5\n").unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(_)));
    }

    #[test]
    fn test_crlf_lines() {
        let crlf = SAMPLE.replace('\n', "\r\n");
        let export = EpExport::parse(&crlf).unwrap();
        assert_eq!(export.header().channels.len(), 2);
        assert_eq!(export.channel("HRA").unwrap().to_vec(), vec![100, 101, 102]);
    }

    #[test]
    fn test_unknown_label() {
        let export = EpExport::parse(SAMPLE).unwrap();
        assert!(matches!(
            export.channel("ABL"),
            Err(ExportError::ChannelNotFound(_))
        ));
    }
}
