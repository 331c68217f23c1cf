use eframe::egui::Color32;

use crate::color::{LabelColors, generate_palette};
use crate::data::model::SignalBuffer;
use crate::session::{Session, SessionError};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// All data mutations go through the wrapped [`Session`]; this struct only
/// adds what the widgets need on top (colours, status line, in-flight drag).
pub struct AppState {
    /// Active annotation session (None until a recording is loaded).
    pub session: Option<Session>,

    /// Label → colour map for annotation spans and the label selector.
    pub label_colors: LabelColors,

    /// One colour per channel, by channel index.
    pub channel_colors: Vec<Color32>,

    /// Vertical offset between stacked traces, from the data's amplitude.
    pub trace_spacing: f64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Free-text entry for a new active label.
    pub label_entry: String,

    /// Plot x where an annotation click-drag started (annotation mode only).
    pub drag_anchor: Option<f64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: None,
            label_colors: LabelColors::default(),
            channel_colors: Vec::new(),
            trace_spacing: 1.0,
            status_message: None,
            label_entry: String::new(),
            drag_anchor: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded recording: start a fresh session, assign
    /// channel colours and pick a trace spacing from the data's amplitude.
    pub fn set_buffer(&mut self, buffer: SignalBuffer) {
        self.channel_colors = generate_palette(buffer.n_channels());
        self.trace_spacing = trace_spacing(&buffer);
        let session = Session::new(buffer);
        self.label_entry = session.active_label().to_string();
        self.session = Some(session);
        self.rebuild_label_colors();
        self.status_message = None;
        self.drag_anchor = None;
    }

    /// Rebuild the label colour map from the session's current labels plus
    /// the active label (so a fresh label gets its colour before first use).
    pub fn rebuild_label_colors(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let mut labels = session.annotations().labels();
        let active = session.active_label();
        if !labels.contains(&active) {
            labels.push(active);
        }
        self.label_colors.rebuild(labels);
    }

    /// Run a session operation, routing any error to the status line.
    /// Returns whether the operation succeeded.
    pub fn run<T>(&mut self, op: impl FnOnce(&mut Session) -> Result<T, SessionError>) -> bool {
        let Some(session) = &mut self.session else {
            return false;
        };
        match op(session) {
            Ok(_) => {
                self.status_message = None;
                self.rebuild_label_colors();
                true
            }
            Err(e) => {
                log::warn!("session operation failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
                false
            }
        }
    }
}

/// Offset between stacked traces: the largest peak-to-peak amplitude across
/// channels, so neighbouring traces cannot overlap at rest.
fn trace_spacing(buffer: &SignalBuffer) -> f64 {
    let spacing = buffer
        .channels()
        .iter()
        .map(|ch| {
            let min = ch.samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = ch.samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            max - min
        })
        .fold(0.0_f64, f64::max);
    if spacing.is_finite() && spacing > 0.0 {
        spacing
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Channel;

    fn buffer() -> SignalBuffer {
        SignalBuffer::new(
            vec![
                Channel {
                    name: "Fp1".into(),
                    samples: vec![-2.0, 2.0, 0.0, 1.0],
                },
                Channel {
                    name: "Cz".into(),
                    samples: vec![0.0, 0.5, -0.5, 0.0],
                },
            ],
            2.0,
            None,
        )
    }

    #[test]
    fn spacing_tracks_largest_peak_to_peak() {
        let mut state = AppState::default();
        state.set_buffer(buffer());
        assert_eq!(state.trace_spacing, 4.0);
        assert_eq!(state.channel_colors.len(), 2);
    }

    #[test]
    fn failed_operation_sets_status() {
        let mut state = AppState::default();
        state.set_buffer(buffer());
        let ok = state.run(|s| s.mark_channel_bad("nope"));
        assert!(!ok);
        assert!(state.status_message.as_deref().unwrap().contains("nope"));
    }
}
