use std::fmt;

// ---------------------------------------------------------------------------
// Channel – one trace of the recording
// ---------------------------------------------------------------------------

/// A single channel of the recording: a name plus its sample vector.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name as stored in the source file (e.g. "Fp1", "Cz").
    pub name: String,
    /// Samples in acquisition order; same length for every channel.
    pub samples: Vec<f64>,
}

// ---------------------------------------------------------------------------
// SignalBuffer – the complete loaded recording
// ---------------------------------------------------------------------------

/// An immutable multi-channel time series at a fixed sampling rate.
///
/// The buffer is loaded once and never mutated; annotation and bad-channel
/// state live in [`crate::session::Session`] and only reference the buffer
/// for validation (channel names, total duration).
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    channels: Vec<Channel>,
    sfreq: f64,
    /// Measurement start in seconds since the Unix epoch, when the source
    /// file carried one. Needed for the absolute-onset annotation convention.
    meas_start: Option<f64>,
}

impl SignalBuffer {
    /// Assemble a buffer from parsed channels.
    ///
    /// All channels must have the same sample count and `sfreq` must be
    /// positive; loaders check this before calling.
    pub fn new(channels: Vec<Channel>, sfreq: f64, meas_start: Option<f64>) -> Self {
        debug_assert!(sfreq > 0.0);
        debug_assert!(
            channels
                .windows(2)
                .all(|w| w[0].samples.len() == w[1].samples.len()),
            "channels must have equal sample counts"
        );
        SignalBuffer {
            channels,
            sfreq,
            meas_start,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Ordered channel names.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    /// Whether `name` is one of this buffer's channels.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name)
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel (0 for an empty buffer).
    pub fn n_samples(&self) -> usize {
        self.channels.first().map_or(0, |c| c.samples.len())
    }

    /// Sampling rate in Hz.
    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.sfreq
    }

    /// Measurement start (seconds since the Unix epoch), if known.
    pub fn meas_start(&self) -> Option<f64> {
        self.meas_start
    }

    /// Time axis value of sample `i`, in seconds from buffer start.
    pub fn time_at(&self, i: usize) -> f64 {
        i as f64 / self.sfreq
    }
}

impl fmt::Display for SignalBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels × {} samples @ {} Hz ({:.1} s)",
            self.n_channels(),
            self.n_samples(),
            self.sfreq,
            self.duration_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_2ch() -> SignalBuffer {
        let channels = vec![
            Channel {
                name: "Fp1".into(),
                samples: vec![0.0; 512],
            },
            Channel {
                name: "Cz".into(),
                samples: vec![0.0; 512],
            },
        ];
        SignalBuffer::new(channels, 256.0, None)
    }

    #[test]
    fn duration_from_sample_count_and_rate() {
        let buf = buffer_2ch();
        assert_eq!(buf.n_samples(), 512);
        assert!((buf.duration_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn channel_lookup() {
        let buf = buffer_2ch();
        assert!(buf.has_channel("Cz"));
        assert!(!buf.has_channel("cz"));
        assert!(!buf.has_channel("Oz"));
    }
}
