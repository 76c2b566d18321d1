use std::fs;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ExportError, Result};
use crate::types::{ChannelLabel, EcgMetadata};
use crate::utils::{clean_lines, parse_row};

/// Number of header lines before the sample rows: format tag, gain line,
/// mapping-channel line, channel label row.
pub const HEADER_LINES: usize = 4;

/// Zero-based index of the channel label row.
pub const CHANNEL_ROW: usize = 3;

static GAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=\s*([-+0-9.eE]+)\s*$").unwrap());
static UNIPOLAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Unipolar Mapping Channel=(\S+)").unwrap());
static BIPOLAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bipolar Mapping Channel=(\S+)").unwrap());
static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Reference Channel=(\S+)").unwrap());

/// Reader for CARTO `*_ECG_Export.txt` files.
///
/// An ECG export carries a short metadata header, a row of channel labels
/// (each a name followed by a parenthesized channel number) and one
/// whitespace-separated row of integer amplitudes per sample. Channels are
/// located by their bare name; extraction returns the requested channels in
/// request order.
///
/// # Examples
///
/// ```rust
/// use cartoexport::EcgExport;
///
/// let text = "\
/// ECG_Export_4.0
/// Raw ECG to MV (gain) = 0.003
/// Unipolar Mapping Channel=M2 Bipolar Mapping Channel=M1-M2 Reference Channel=REF
/// I(1) II(2) M1(26) M1-M2(30)
/// 10 20 30 40
/// 11 21 31 41
/// 12 22 32 42
/// ";
///
/// let export = EcgExport::parse(text)?;
/// assert_eq!(export.samples(), 3);
/// assert_eq!(export.metadata().gain, 0.003);
///
/// // Channels come back in request order, windowed by sample bounds.
/// let traces = export.extract(&["M1-M2", "I"], 1, Some(2))?;
/// assert_eq!(traces.shape(), &[2, 2]);
/// assert_eq!(traces.row(0).to_vec(), vec![41, 42]);
/// assert_eq!(traces.row(1).to_vec(), vec![11, 12]);
/// # Ok::<(), cartoexport::ExportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EcgExport {
    metadata: EcgMetadata,
    channels: Vec<ChannelLabel>,
    /// Amplitudes shaped `(samples, channels)`, in file order.
    data: Array2<i32>,
}

impl EcgExport {
    /// Opens and parses an ECG export file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path).map_err(|e| {
            ExportError::FileNotFound(format!("{}: {}", path.as_ref().display(), e))
        })?;
        debug!("parsing ECG export {}", path.as_ref().display());
        Self::parse(&text)
    }

    /// Parses an ECG export from text.
    pub fn parse(text: &str) -> Result<Self> {
        let lines = clean_lines(text);
        if lines.len() < HEADER_LINES + 1 {
            return Err(ExportError::TruncatedFile {
                expected: HEADER_LINES + 1,
                found: lines.len(),
            });
        }

        if !lines[0].starts_with("ECG_Export") {
            return Err(ExportError::InvalidFormat(format!(
                "not an ECG export (first line {:?})",
                lines[0]
            )));
        }

        let metadata = EcgMetadata {
            format_tag: lines[0].trim().to_string(),
            gain: parse_gain(lines[1])?,
            unipolar_channel: capture(&UNIPOLAR_RE, lines[2]),
            bipolar_channel: capture(&BIPOLAR_RE, lines[2]),
            reference_channel: capture(&REFERENCE_RE, lines[2]),
        };

        let channels: Vec<ChannelLabel> = lines[CHANNEL_ROW]
            .split_whitespace()
            .map(ChannelLabel::parse)
            .collect();
        if channels.is_empty() {
            return Err(ExportError::InvalidFormat(
                "channel label row is empty".to_string(),
            ));
        }

        let mut values = Vec::new();
        let mut samples = 0usize;
        for (row, line) in lines[HEADER_LINES..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<i32> = parse_row(line, row)?;
            if fields.len() != channels.len() {
                return Err(ExportError::InvalidFormat(format!(
                    "data row {} has {} values for {} channels",
                    row,
                    fields.len(),
                    channels.len()
                )));
            }
            values.extend_from_slice(&fields);
            samples += 1;
        }

        let data = Array2::from_shape_vec((samples, channels.len()), values)
            .map_err(|e| ExportError::ShapeMismatch(e.to_string()))?;

        Ok(EcgExport {
            metadata,
            channels,
            data,
        })
    }

    pub fn metadata(&self) -> &EcgMetadata {
        &self.metadata
    }

    /// All channel labels, in file column order.
    pub fn channels(&self) -> &[ChannelLabel] {
        &self.channels
    }

    /// Bare channel names, in file column order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    /// Number of sample rows in the export.
    pub fn samples(&self) -> usize {
        self.data.nrows()
    }

    /// Column index of the named channel.
    pub fn channel_index(&self, name: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ExportError::ChannelNotFound(name.to_string()))
    }

    /// Full amplitude series of one channel.
    pub fn channel(&self, name: &str) -> Result<Array1<i32>> {
        let index = self.channel_index(name)?;
        Ok(self.data.column(index).to_owned())
    }

    /// Extracts the named channels over the sample window `start..start+count`.
    ///
    /// When `count` is `None` the window runs to the end of the file. The
    /// result is shaped `(channels, samples)` with rows in request order.
    /// A window reaching past the last sample is an error rather than a
    /// silently shorter array.
    pub fn extract(&self, names: &[&str], start: usize, count: Option<usize>) -> Result<Array2<i32>> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| self.channel_index(name))
            .collect::<Result<_>>()?;

        let available = self.samples();
        let end = match count {
            // Saturate on overflow so an absurd window fails the bounds
            // check instead of panicking.
            Some(count) => start.checked_add(count).unwrap_or(usize::MAX),
            None => available,
        };
        if end > available || start > end {
            return Err(ExportError::SampleRangeOutOfBounds {
                start,
                end,
                available,
            });
        }

        let mut out = Array2::zeros((indices.len(), end - start));
        for (row, &col) in indices.iter().enumerate() {
            for (i, sample) in (start..end).enumerate() {
                out[[row, i]] = self.data[[sample, col]];
            }
        }
        Ok(out)
    }

    /// Like [`extract`](Self::extract), but converts amplitudes to millivolts
    /// using the header gain.
    pub fn extract_millivolts(
        &self,
        names: &[&str],
        start: usize,
        count: Option<usize>,
    ) -> Result<Array2<f64>> {
        let digital = self.extract(names, start, count)?;
        Ok(digital.mapv(|v| v as f64 * self.metadata.gain))
    }
}

fn parse_gain(line: &str) -> Result<f64> {
    let caps = GAIN_RE
        .captures(line)
        .ok_or_else(|| ExportError::InvalidFormat(format!("bad gain line {line:?}")))?;
    caps.get(1)
        .unwrap()
        .as_str()
        .parse()
        .map_err(|_| ExportError::InvalidFormat(format!("bad gain line {line:?}")))
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .map(|caps| caps.get(1).unwrap().as_str().to_string())
}
