use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::annotations::AnnotationList;
use super::error::{Result, SessionError};

// ---------------------------------------------------------------------------
// Onset convention – relative vs. absolute, selected by file extension
// ---------------------------------------------------------------------------

/// How onsets are written to / read from an annotation file.
///
/// `.csv` files carry absolute timestamps (epoch seconds, measurement start
/// added in); every other extension carries onsets relative to buffer start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnsetConvention {
    Relative,
    /// Offset is the recording's measurement start in epoch seconds.
    Absolute(f64),
}

impl OnsetConvention {
    /// Pick the convention for `path` given the buffer's measurement start.
    ///
    /// Fails when the path asks for absolute onsets but the recording does
    /// not carry a measurement start.
    pub fn for_path(path: &Path, meas_start: Option<f64>) -> Result<Self> {
        let wants_absolute = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !wants_absolute {
            return Ok(OnsetConvention::Relative);
        }
        match meas_start {
            Some(start) => Ok(OnsetConvention::Absolute(start)),
            None => Err(SessionError::InvalidInterval(
                "absolute-onset (.csv) files need a recording with a measurement start".into(),
            )),
        }
    }

    fn to_file(self, onset: f64) -> f64 {
        match self {
            OnsetConvention::Relative => onset,
            OnsetConvention::Absolute(start) => onset + start,
        }
    }

    fn from_file(self, onset: f64) -> f64 {
        match self {
            OnsetConvention::Relative => onset,
            OnsetConvention::Absolute(start) => onset - start,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotation files: header `onset,duration,description`
// ---------------------------------------------------------------------------

/// Write the annotation collection as delimited text.
///
/// Refuses to replace an existing file unless `overwrite` is set. The write
/// goes to a temporary sibling which is renamed into place, so a failure
/// never leaves a truncated file behind.
pub fn save_annotations(
    path: &Path,
    annotations: &AnnotationList,
    convention: OnsetConvention,
    overwrite: bool,
) -> Result<()> {
    check_overwrite(path, overwrite)?;

    let tmp = tmp_sibling(path);
    let result = write_annotations(&tmp, annotations, convention)
        .and_then(|()| fs::rename(&tmp, path).map_err(SessionError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_annotations(
    path: &Path,
    annotations: &AnnotationList,
    convention: OnsetConvention,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_io_error)?;
    writer
        .write_record(["onset", "duration", "description"])
        .map_err(csv_io_error)?;
    for a in annotations.iter() {
        // f64 Display is shortest-round-trip exact, so a load reproduces the
        // saved onsets and durations bit for bit.
        writer
            .write_record([
                convention.to_file(a.onset).to_string(),
                a.duration.to_string(),
                a.label.clone(),
            ])
            .map_err(csv_io_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse an annotation file back into `(onset, duration, label)` triples.
///
/// The whole file is parsed before anything is returned, so a malformed row
/// leaves the caller's state untouched.
pub fn load_annotations(
    path: &Path,
    convention: OnsetConvention,
) -> Result<Vec<(f64, f64, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_io_error)?;

    let headers = reader.headers().map_err(csv_io_error)?;
    if headers.len() != 3 {
        return Err(SessionError::parse(
            1,
            format!("expected 3 header columns, found {}", headers.len()),
        ));
    }

    let mut triples = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e
                .position()
                .map_or(0, |p| p.line() as usize);
            SessionError::parse(line, e.to_string())
        })?;
        let line = record
            .position()
            .map_or(0, |p| p.line() as usize);

        if record.len() != 3 {
            return Err(SessionError::parse(
                line,
                format!("expected 3 columns, found {}", record.len()),
            ));
        }

        let onset: f64 = record[0]
            .trim()
            .parse()
            .map_err(|_| SessionError::parse(line, format!("non-numeric onset '{}'", &record[0])))?;
        let duration: f64 = record[1].trim().parse().map_err(|_| {
            SessionError::parse(line, format!("non-numeric duration '{}'", &record[1]))
        })?;

        triples.push((
            convention.from_file(onset),
            duration,
            record[2].to_string(),
        ));
    }
    Ok(triples)
}

// ---------------------------------------------------------------------------
// Bad-channel files: one comma-joined line
// ---------------------------------------------------------------------------

/// Write the bad-channel set as a single comma-joined line with a trailing
/// newline. Same overwrite and atomicity rules as [`save_annotations`].
pub fn save_bad_channels(path: &Path, bads: &BTreeSet<String>, overwrite: bool) -> Result<()> {
    check_overwrite(path, overwrite)?;

    let tmp = tmp_sibling(path);
    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp)?;
        let line: Vec<&str> = bads.iter().map(|s| s.as_str()).collect();
        writeln!(file, "{}", line.join(","))?;
        file.flush()?;
        Ok(())
    })()
    .and_then(|()| fs::rename(&tmp, path).map_err(SessionError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Read a bad-channel file back into a name list. An empty file (or a bare
/// newline) yields an empty list.
pub fn load_bad_channels(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .next()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_overwrite(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(SessionError::FileExists(path.to_path_buf()));
    }
    Ok(())
}

/// Temp file in the same directory so the final rename stays on one
/// filesystem.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Collapse csv-crate errors into the session's I/O / parse kinds.
fn csv_io_error(e: csv::Error) -> SessionError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => SessionError::Io(io),
        other => SessionError::parse(0, format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::annotations::AnnotationList;

    #[test]
    fn annotation_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");

        let mut list = AnnotationList::new();
        list.insert_merged(2.0, 1.5, "BAD");
        list.insert_merged(4.25, 0.5, "stimulus");

        save_annotations(&path, &list, OnsetConvention::Relative, false).unwrap();
        let triples = load_annotations(&path, OnsetConvention::Relative).unwrap();
        assert_eq!(
            triples,
            vec![
                (2.0, 1.5, "BAD".to_string()),
                (4.25, 0.5, "stimulus".to_string())
            ]
        );
    }

    #[test]
    fn round_trip_is_bit_exact_for_non_terminating_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");

        let mut list = AnnotationList::new();
        let onset = 1.0 / 3.0;
        let duration = 0.1 + 0.2; // 0.30000000000000004
        list.insert_merged(onset, duration, "BAD");

        save_annotations(&path, &list, OnsetConvention::Relative, false).unwrap();
        let triples = load_annotations(&path, OnsetConvention::Relative).unwrap();
        assert_eq!(triples, vec![(onset, duration, "BAD".to_string())]);
    }

    #[test]
    fn absolute_convention_shifts_onsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.csv");

        let mut list = AnnotationList::new();
        list.insert_merged(2.0, 1.0, "BAD");

        let conv = OnsetConvention::Absolute(1_000.0);
        save_annotations(&path, &list, conv, false).unwrap();

        // On disk the onset is absolute.
        let raw = load_annotations(&path, OnsetConvention::Relative).unwrap();
        assert_eq!(raw[0].0, 1_002.0);

        // Reading back with the same convention restores relative onsets.
        let triples = load_annotations(&path, conv).unwrap();
        assert_eq!(triples[0].0, 2.0);
    }

    #[test]
    fn csv_extension_requires_meas_start() {
        let err = OnsetConvention::for_path(Path::new("out.csv"), None).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInterval(_)));
        assert!(matches!(
            OnsetConvention::for_path(Path::new("out.txt"), None),
            Ok(OnsetConvention::Relative)
        ));
    }

    #[test]
    fn save_without_overwrite_fails_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");
        let list = AnnotationList::new();

        save_annotations(&path, &list, OnsetConvention::Relative, false).unwrap();
        let err = save_annotations(&path, &list, OnsetConvention::Relative, false).unwrap_err();
        assert!(matches!(err, SessionError::FileExists(_)));

        // With overwrite set, the second save wins.
        let mut list2 = AnnotationList::new();
        list2.insert_merged(1.0, 1.0, "BAD");
        save_annotations(&path, &list2, OnsetConvention::Relative, true).unwrap();
        let triples = load_annotations(&path, OnsetConvention::Relative).unwrap();
        assert_eq!(triples, vec![(1.0, 1.0, "BAD".to_string())]);
    }

    #[test]
    fn malformed_row_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");
        std::fs::write(&path, "onset,duration,description\nabc,1.0,BAD\n").unwrap();

        let err = load_annotations(&path, OnsetConvention::Relative).unwrap_err();
        assert!(matches!(err, SessionError::ParseError { .. }));
    }

    #[test]
    fn wrong_column_count_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");
        std::fs::write(&path, "onset,duration,description\n1.0,2.0\n").unwrap();

        let err = load_annotations(&path, OnsetConvention::Relative).unwrap_err();
        assert!(matches!(err, SessionError::ParseError { .. }));
    }

    #[test]
    fn bad_channel_line_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.bads");

        let bads: BTreeSet<String> = ["Cz".to_string(), "Fp1".to_string()].into();
        save_bad_channels(&path, &bads, false).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Cz,Fp1\n");
        assert_eq!(load_bad_channels(&path).unwrap(), vec!["Cz", "Fp1"]);
    }

    #[test]
    fn empty_bad_channel_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.bads");
        save_bad_channels(&path, &BTreeSet::new(), false).unwrap();
        assert!(load_bad_channels(&path).unwrap().is_empty());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annot.txt");
        let list = AnnotationList::new();
        save_annotations(&path, &list, OnsetConvention::Relative, false).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("annot.txt")]);
    }
}
