//! # cartoexport
//!
//! A Rust library for reading the text exports produced by the CARTO 3
//! electroanatomical mapping system: per-point multi-lead ECG exports,
//! contact-force catheter exports and the sectioned exports of older
//! EP recording systems.
//!
//! Every export is a fixed-offset text table. ECG exports name their
//! channels in a header row (`M1(26) M1-M2(30) …`); channels are located by
//! the bare name and extracted by column index, windowed by caller-supplied
//! sample bounds. Contact-force exports have a fixed header and a known
//! column layout. One parser per format replaces the per-script variants
//! that tend to accumulate around these files.
//!
//! ## Quick start
//!
//! ### Extracting ECG channels
//!
//! ```rust
//! use cartoexport::EcgExport;
//!
//! let text = "\
//! ECG_Export_4.0
//! Raw ECG to MV (gain) = 0.003
//! Unipolar Mapping Channel=M2 Bipolar Mapping Channel=M1-M2 Reference Channel=REF
//! I(1) II(2) M1(26) M2(27) M1-M2(30)
//! 4 8 15 16 23
//! 5 9 16 17 24
//! ";
//!
//! let export = EcgExport::parse(text)?;
//! assert_eq!(export.samples(), 2);
//!
//! let traces = export.extract(&["M1-M2", "II"], 0, None)?;
//! assert_eq!(traces.shape(), &[2, 2]);
//! assert_eq!(traces.row(0).to_vec(), vec![23, 24]);
//! # Ok::<(), cartoexport::ExportError>(())
//! ```
//!
//! ### Loading a study directory
//!
//! ```rust,no_run
//! use cartoexport::study::{load_dir, LoadOptions};
//!
//! let study = load_dir("Export_2021E150".as_ref(), Some(10), &LoadOptions::default())?;
//! // (points, traces, samples): force/axial/lateral windows and the six
//! // mapping channels, aligned by point.
//! assert_eq!(study.contact_force.shape()[1..], [3, 50]);
//! assert_eq!(study.ecg.shape()[1..], [6, 2500]);
//! # Ok::<(), cartoexport::ExportError>(())
//! ```

pub mod contact_force;
pub mod ecg;
pub mod ep;
pub mod error;
pub mod study;
pub mod types;
pub mod utils;
pub mod writer;

pub use contact_force::ContactForceExport;
pub use ecg::EcgExport;
pub use ep::EpExport;
pub use error::{ExportError, Result};
pub use types::{ChannelLabel, EcgMetadata, ExportStem, PointId, StudyData};

/// Nominal number of samples in a contact-force export (200 at ~60 Hz;
/// some exports carry one extra row).
pub const CF_SAMPLES: usize = 200;

/// Nominal number of samples in an ECG export (2.5 s at 1 kHz).
pub const ECG_SAMPLES: usize = 2500;

/// The mapping-catheter channels extracted by default when loading a study.
pub const MAPPING_CHANNELS: [&str; 6] = ["M1", "M2", "M3", "M4", "M1-M2", "M3-M4"];

/// Library version
///
/// ```rust
/// let version = cartoexport::version();
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
