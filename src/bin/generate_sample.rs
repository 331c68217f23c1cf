use std::sync::Arc;

use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const SFREQ: f64 = 256.0;
const DURATION_SECS: f64 = 60.0;
const MEAS_START: f64 = 1_700_000_000.0;

fn gaussian(t: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(t - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// One channel's trace: band-limited oscillations, noise, and for the
/// frontal channels a train of blink-like bumps.
fn generate_channel(
    n_samples: usize,
    alpha_amp: f64,
    theta_amp: f64,
    blinks: &[f64],
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let phase_a = rng.next_f64() * std::f64::consts::TAU;
    let phase_t = rng.next_f64() * std::f64::consts::TAU;

    (0..n_samples)
        .map(|i| {
            let t = i as f64 / SFREQ;
            let alpha = alpha_amp * (std::f64::consts::TAU * 10.0 * t + phase_a).sin();
            let theta = theta_amp * (std::f64::consts::TAU * 5.5 * t + phase_t).sin();
            let blink: f64 = blinks
                .iter()
                .map(|&mu| gaussian(t, mu, 0.15, 80.0))
                .sum();
            alpha + theta + blink + rng.gauss(0.0, 2.5)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let n_samples = (SFREQ * DURATION_SECS) as usize;

    // Blink artifacts land on the frontal channels only.
    let blink_times: Vec<f64> = (0..8).map(|i| 4.0 + 7.0 * i as f64).collect();

    // (name, alpha amplitude, theta amplitude, has blinks)
    let montage: [(&str, f64, f64, bool); 8] = [
        ("Fp1", 6.0, 4.0, true),
        ("Fp2", 6.0, 4.0, true),
        ("F3", 8.0, 5.0, false),
        ("F4", 8.0, 5.0, false),
        ("C3", 10.0, 4.0, false),
        ("C4", 10.0, 4.0, false),
        ("O1", 18.0, 3.0, false),
        ("O2", 18.0, 3.0, false),
    ];

    let mut names: Vec<&str> = Vec::new();
    let mut all_samples: Vec<Vec<f64>> = Vec::new();
    for &(name, alpha_amp, theta_amp, has_blinks) in &montage {
        let blinks: &[f64] = if has_blinks { &blink_times } else { &[] };
        names.push(name);
        all_samples.push(generate_channel(n_samples, alpha_amp, theta_amp, blinks, &mut rng));
    }

    // Build Arrow arrays: one row per channel.
    let mut samples_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_samples {
        let values = samples_builder.values();
        for &v in row {
            values.append_value(v);
        }
        samples_builder.append(true);
    }
    let samples_array = samples_builder.finish();

    let name_array = StringArray::from(names.clone());
    let sfreq_array = Float64Array::from(vec![SFREQ; montage.len()]);
    let meas_start_array = Float64Array::from(vec![MEAS_START; montage.len()]);

    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new(
            "samples",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("sfreq", DataType::Float64, false),
        Field::new("meas_start", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(name_array),
            Arc::new(samples_array),
            Arc::new(sfreq_array),
            Arc::new(meas_start_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let output_path = "sample_recording.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} channels ({n_samples} samples each @ {SFREQ} Hz) to {output_path}",
        montage.len()
    );
}
