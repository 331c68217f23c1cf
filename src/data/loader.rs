use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Channel, SignalBuffer};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a recording from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per channel: `name` (Utf8), `samples` (List<Float64>),
///   optional `sfreq` / `meas_start` (Float64) columns
/// * `.json`    – `{ "sfreq": ..., "meas_start": ..., "channels": [...] }`
/// * `.csv`     – columns `name,sfreq,samples` with semicolon-separated floats
pub fn load_file(path: &Path) -> Result<SignalBuffer> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Consistency checks shared by all loaders.
fn assemble(channels: Vec<Channel>, sfreq: f64, meas_start: Option<f64>) -> Result<SignalBuffer> {
    if channels.is_empty() {
        bail!("Recording contains no channels");
    }
    if sfreq <= 0.0 || !sfreq.is_finite() {
        bail!("Sampling rate must be positive, got {sfreq}");
    }
    let n = channels[0].samples.len();
    for ch in &channels {
        if ch.samples.len() != n {
            bail!(
                "Channel '{}' has {} samples but '{}' has {}",
                ch.name,
                ch.samples.len(),
                channels[0].name,
                n
            );
        }
    }
    let mut seen: Vec<&str> = Vec::with_capacity(channels.len());
    for ch in &channels {
        if seen.contains(&ch.name.as_str()) {
            bail!("Duplicate channel name '{}'", ch.name);
        }
        seen.push(&ch.name);
    }
    Ok(SignalBuffer::new(channels, sfreq, meas_start))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct JsonRecording {
    sfreq: f64,
    #[serde(default)]
    meas_start: Option<f64>,
    channels: Vec<JsonChannel>,
}

#[derive(Deserialize)]
struct JsonChannel {
    name: String,
    samples: Vec<f64>,
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "sfreq": 256.0,
///   "meas_start": 1699000000.0,
///   "channels": [
///     { "name": "Fp1", "samples": [0.12, 0.14, ...] },
///     { "name": "Cz",  "samples": [0.02, 0.01, ...] }
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<SignalBuffer> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rec: JsonRecording = serde_json::from_str(&text).context("parsing JSON recording")?;

    let channels = rec
        .channels
        .into_iter()
        .map(|c| Channel {
            name: c.name,
            samples: c.samples,
        })
        .collect();

    assemble(channels, rec.sfreq, rec.meas_start)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row `name,sfreq,samples` (extra columns ignored).
/// One row per channel; `samples` contains semicolon-separated floats:
///   `"0.12;0.14;0.11"`
/// Every row must carry the same `sfreq`.
fn load_csv(path: &Path) -> Result<SignalBuffer> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let name_idx = headers
        .iter()
        .position(|h| h == "name")
        .context("CSV missing 'name' column")?;
    let sfreq_idx = headers
        .iter()
        .position(|h| h == "sfreq")
        .context("CSV missing 'sfreq' column")?;
    let samples_idx = headers
        .iter()
        .position(|h| h == "samples")
        .context("CSV missing 'samples' column")?;

    let mut channels = Vec::new();
    let mut sfreq: Option<f64> = None;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let name = record.get(name_idx).unwrap_or("").to_string();
        let row_sfreq: f64 = record
            .get(sfreq_idx)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("CSV row {row_no}: invalid sfreq"))?;
        let samples = parse_semicolon_floats(record.get(samples_idx).unwrap_or(""), row_no)?;

        match sfreq {
            None => sfreq = Some(row_sfreq),
            Some(s) if (s - row_sfreq).abs() > f64::EPSILON => {
                bail!("CSV row {row_no}: sfreq {row_sfreq} differs from {s}")
            }
            Some(_) => {}
        }

        channels.push(Channel { name, samples });
    }

    let sfreq = sfreq.context("CSV contains no data rows")?;
    assemble(channels, sfreq, None)
}

fn parse_semicolon_floats(s: &str, row: usize) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, samples[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet recording.
///
/// Expected schema, one row per channel:
/// - `name`: Utf8 – channel name
/// - `samples`: List<Float64> or LargeList<Float64> – sample vector
/// - `sfreq`: Float64 (optional column; the first row's value is used)
/// - `meas_start`: Float64 (optional; seconds since the Unix epoch)
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<SignalBuffer> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut channels = Vec::new();
    let mut sfreq: Option<f64> = None;
    let mut meas_start: Option<f64> = None;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let name_idx = schema
            .index_of("name")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'name' column"))?;
        let samples_idx = schema
            .index_of("samples")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'samples' column"))?;

        let name_col = batch
            .column(name_idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .context("'name' column is not Utf8")?;
        let samples_col = batch.column(samples_idx);

        if n_rows > 0 {
            if sfreq.is_none() {
                if let Ok(idx) = schema.index_of("sfreq") {
                    sfreq = extract_f64_scalar(batch.column(idx), 0);
                }
            }
            if meas_start.is_none() {
                if let Ok(idx) = schema.index_of("meas_start") {
                    meas_start = extract_f64_scalar(batch.column(idx), 0);
                }
            }
        }

        for row in 0..n_rows {
            let samples = extract_f64_list(samples_col, row)
                .with_context(|| format!("Row {row}: failed to read 'samples'"))?;
            channels.push(Channel {
                name: name_col.value(row).to_string(),
                samples,
            });
        }
    }

    let sfreq = sfreq.context("Parquet file missing 'sfreq' column")?;
    assemble(channels, sfreq, meas_start)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Read a Float64/Float32 scalar cell, `None` when null or not a float column.
fn extract_f64_scalar(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Some(arr.value(row))
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Some(arr.value(row) as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_round() {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(f, "name,sfreq,samples").unwrap();
        writeln!(f, "Fp1,256.0,0.1;0.2;0.3").unwrap();
        writeln!(f, "Cz,256.0,0.4;0.5;0.6").unwrap();
        f.flush().unwrap();

        let buf = load_file(f.path()).unwrap();
        assert_eq!(buf.n_channels(), 2);
        assert_eq!(buf.n_samples(), 3);
        assert!((buf.sfreq() - 256.0).abs() < 1e-12);
        assert!(buf.has_channel("Cz"));
    }

    #[test]
    fn csv_rejects_ragged_channels() {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(f, "name,sfreq,samples").unwrap();
        writeln!(f, "Fp1,256.0,0.1;0.2;0.3").unwrap();
        writeln!(f, "Cz,256.0,0.4;0.5").unwrap();
        f.flush().unwrap();

        assert!(load_file(f.path()).is_err());
    }

    #[test]
    fn json_round() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            f,
            r#"{{"sfreq": 128.0, "meas_start": 1699000000.5,
                "channels": [{{"name": "Fp1", "samples": [1.0, 2.0]}},
                             {{"name": "Fp2", "samples": [3.0, 4.0]}}]}}"#
        )
        .unwrap();
        f.flush().unwrap();

        let buf = load_file(f.path()).unwrap();
        assert_eq!(buf.n_channels(), 2);
        assert_eq!(buf.meas_start(), Some(1699000000.5));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(load_file(Path::new("recording.edf")).is_err());
    }

    #[test]
    fn duplicate_channel_names_are_rejected() {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(f, "name,sfreq,samples").unwrap();
        writeln!(f, "Fp1,256.0,0.1").unwrap();
        writeln!(f, "Fp1,256.0,0.2").unwrap();
        f.flush().unwrap();

        assert!(load_file(f.path()).is_err());
    }
}
