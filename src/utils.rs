use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ExportError, Result};

/// Channel label as written in the export header row: a name followed by a
/// parenthesized channel number, e.g. `M1-M2(30)`.
static CHANNEL_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)\((\d+)\)$").unwrap());

/// Point export filenames: `<map>_P<point>_ContactForce.txt` and
/// `<map>_P<point>_ECG_Export.txt`.
static POINT_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_P([^_]+)_(ContactForce|ECG_Export)\.txt$").unwrap());

/// Study export archive stems: `Export_<study>-<dd>_<mm>_<yyyy>-<HH>-<MM>-<SS>`.
static EXPORT_STEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Export_(.+)-(\d{2})_(\d{2})_(\d{4})-(\d{2})-(\d{2})-(\d{2})$").unwrap()
});

/// Strips the parenthesized channel number from a header label.
///
/// Returns the bare channel name and, when present, the number. Labels
/// without a parenthesized suffix are returned unchanged.
///
/// ```rust
/// use cartoexport::utils::strip_channel_label;
///
/// assert_eq!(strip_channel_label("M1-M2(30)"), ("M1-M2", Some(30)));
/// assert_eq!(strip_channel_label("aVF(5)"), ("aVF", Some(5)));
/// assert_eq!(strip_channel_label("REF"), ("REF", None));
/// ```
pub fn strip_channel_label(label: &str) -> (&str, Option<u32>) {
    match CHANNEL_LABEL_RE.captures(label) {
        Some(caps) => {
            let name = caps.get(1).unwrap().as_str();
            let number = caps.get(2).unwrap().as_str().parse().ok();
            (name, number)
        }
        None => (label, None),
    }
}

/// Splits a point export filename into map name, point number and file kind.
///
/// Returns `None` for filenames that do not follow the
/// `<map>_P<point>_<kind>.txt` convention.
pub fn parse_point_filename(filename: &str) -> Option<(&str, &str, PointFileKind)> {
    let caps = POINT_FILE_RE.captures(filename)?;
    let kind = match caps.get(3).unwrap().as_str() {
        "ContactForce" => PointFileKind::ContactForce,
        _ => PointFileKind::Ecg,
    };
    Some((
        caps.get(1).unwrap().as_str(),
        caps.get(2).unwrap().as_str(),
        kind,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFileKind {
    ContactForce,
    Ecg,
}

/// Parses a study archive stem into the study identifier and export timestamp.
///
/// The mapping system names its archives
/// `Export_<study>-<dd>_<mm>_<yyyy>-<HH>-<MM>-<SS>`, e.g.
/// `Export_2021E150-04_08_2021-14-49-19`.
pub fn parse_export_stem(stem: &str) -> Option<(String, chrono::NaiveDateTime)> {
    let caps = EXPORT_STEM_RE.captures(stem)?;
    let num = |i: usize| caps.get(i).unwrap().as_str().parse::<u32>().unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(num(4) as i32, num(3), num(2))?;
    let time = chrono::NaiveTime::from_hms_opt(num(5), num(6), num(7))?;
    Some((caps.get(1).unwrap().as_str().to_string(), date.and_time(time)))
}

/// Parses one whitespace-separated numeric data row.
///
/// `row` is the zero-based sample row index, used for error reporting only.
pub(crate) fn parse_row<T: FromStr>(line: &str, row: usize) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|field| {
            field.parse().map_err(|_| ExportError::InvalidNumber {
                row,
                value: field.to_string(),
            })
        })
        .collect()
}

/// Parses one delimiter-separated numeric data row (EP exports use commas).
pub(crate) fn parse_delimited_row<T: FromStr>(line: &str, delim: char, row: usize) -> Result<Vec<T>> {
    line.split(delim)
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            field.parse().map_err(|_| ExportError::InvalidNumber {
                row,
                value: field.to_string(),
            })
        })
        .collect()
}

/// Splits export text into lines with trailing carriage returns removed.
pub(crate) fn clean_lines(text: &str) -> Vec<&str> {
    text.lines().map(|line| line.trim_end_matches('\r')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_channel_label() {
        assert_eq!(strip_channel_label("I(1)"), ("I", Some(1)));
        assert_eq!(strip_channel_label("M1(26)"), ("M1", Some(26)));
        assert_eq!(strip_channel_label("M1-M2(30)"), ("M1-M2", Some(30)));
        assert_eq!(strip_channel_label("CS9-CS10(42)"), ("CS9-CS10", Some(42)));
        assert_eq!(strip_channel_label("REF"), ("REF", None));
    }

    #[test]
    fn test_parse_point_filename() {
        let (map, point, kind) = parse_point_filename("1-SR_P1181_ECG_Export.txt").unwrap();
        assert_eq!(map, "1-SR");
        assert_eq!(point, "1181");
        assert_eq!(kind, PointFileKind::Ecg);

        let (map, point, kind) = parse_point_filename("1-SR_P7_ContactForce.txt").unwrap();
        assert_eq!(map, "1-SR");
        assert_eq!(point, "7");
        assert_eq!(kind, PointFileKind::ContactForce);

        assert!(parse_point_filename("VisiTagExport.txt").is_none());
    }

    #[test]
    fn test_parse_export_stem() {
        let (study, exported_at) =
            parse_export_stem("Export_2021E150-04_08_2021-14-49-19").unwrap();
        assert_eq!(study, "2021E150");
        assert_eq!(
            exported_at,
            chrono::NaiveDate::from_ymd_opt(2021, 8, 4)
                .unwrap()
                .and_hms_opt(14, 49, 19)
                .unwrap()
        );

        assert!(parse_export_stem("Export_nodate").is_none());
    }

    #[test]
    fn test_parse_row() {
        let row: Vec<i32> = parse_row("10 -20\t30", 0).unwrap();
        assert_eq!(row, vec![10, -20, 30]);

        let err = parse_row::<i32>("10 x 30", 4).unwrap_err();
        assert!(matches!(err, ExportError::InvalidNumber { row: 4, .. }));
    }

    #[test]
    fn test_parse_delimited_row() {
        let row: Vec<i32> = parse_delimited_row("1, 2,3,", ',', 0).unwrap();
        assert_eq!(row, vec![1, 2, 3]);
    }
}
