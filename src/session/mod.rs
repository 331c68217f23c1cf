/// Session layer: annotation and bad-channel state over a loaded recording.
///
/// Architecture:
/// ```text
///   ┌─────────────┐     validates against     ┌──────────────┐
///   │   Session    │ ────────────────────────▶ │ SignalBuffer  │ (read-only)
///   └─────────────┘                            └──────────────┘
///      │        │
///      ▼        ▼
///  AnnotationList   BTreeSet<String> (bad channels)
///      │        │
///      └───io───┘   delimited text: onset,duration,description / comma line
/// ```
///
/// Every operation is synchronous and all-or-nothing: an error leaves the
/// session exactly as it was.
pub mod annotations;
pub mod error;
pub mod io;
pub mod modes;

use std::collections::BTreeSet;
use std::path::Path;

use crate::data::model::SignalBuffer;

pub use annotations::{Annotation, AnnotationId, AnnotationList};
pub use error::{Result, SessionError};
pub use io::OnsetConvention;
pub use modes::ViewModes;

/// Default label for new annotations; the `BAD_` prefix marks the interval
/// for downstream exclusion.
pub const DEFAULT_LABEL: &str = "BAD_";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// In-memory annotation session over an immutable recording.
///
/// Owns the annotation collection, the bad-channel set, the active label and
/// the display-mode flags. The buffer is only consulted for validation
/// (channel names, total duration) and is never mutated.
pub struct Session {
    buffer: SignalBuffer,
    annotations: AnnotationList,
    bad_channels: BTreeSet<String>,
    active_label: String,
    pub modes: ViewModes,
}

impl Session {
    /// Start an empty session over `buffer`.
    pub fn new(buffer: SignalBuffer) -> Self {
        Session {
            buffer,
            annotations: AnnotationList::new(),
            bad_channels: BTreeSet::new(),
            active_label: DEFAULT_LABEL.to_string(),
            modes: ViewModes::default(),
        }
    }

    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }

    pub fn annotations(&self) -> &AnnotationList {
        &self.annotations
    }

    pub fn bad_channels(&self) -> &BTreeSet<String> {
        &self.bad_channels
    }

    pub fn active_label(&self) -> &str {
        &self.active_label
    }

    /// Record the label new annotations will use. Metadata only; the
    /// annotation collection is untouched.
    pub fn set_active_label(&mut self, label: impl Into<String>) {
        self.active_label = label.into();
    }

    // -- annotations --------------------------------------------------------

    /// Append a labeled interval, merging same-label overlaps into the union.
    ///
    /// With snap mode off, an interval strictly nested inside an existing
    /// annotation of a *different* label is rejected (same-label nesting is
    /// resolved by the merge instead).
    pub fn create_annotation(
        &mut self,
        onset: f64,
        duration: f64,
        label: &str,
    ) -> Result<AnnotationId> {
        self.check_interval(onset, duration)?;
        if label.is_empty() {
            return Err(SessionError::InvalidInterval(
                "annotation label must not be empty".into(),
            ));
        }

        let end = onset + duration;
        if !self.modes.snap {
            let nested_in_other = self
                .annotations
                .iter()
                .any(|a| a.label != label && a.contains_strictly(onset, end));
            if nested_in_other {
                return Err(SessionError::InvalidInterval(format!(
                    "interval [{onset}, {end}) lies inside an existing annotation \
                     (disallowed while snap is off)"
                )));
            }
        }

        Ok(self.annotations.insert_merged(onset, duration, label))
    }

    /// Shorthand used by the interactive surface: create with the active
    /// label.
    pub fn create_with_active_label(&mut self, onset: f64, duration: f64) -> Result<AnnotationId> {
        let label = self.active_label.clone();
        self.create_annotation(onset, duration, &label)
    }

    /// Drag the endpoints of `id` to `[new_onset, new_end)`.
    ///
    /// With snap mode on, the edit is rejected when the new interval would
    /// nest entirely inside another same-label annotation. Same-label
    /// overlaps created by the edit are re-merged.
    pub fn edit_annotation_bounds(
        &mut self,
        id: AnnotationId,
        new_onset: f64,
        new_end: f64,
    ) -> Result<AnnotationId> {
        let label = self
            .annotations
            .get(id)
            .ok_or(SessionError::NotFound(id))?
            .label
            .clone();
        if new_end < new_onset {
            return Err(SessionError::InvalidInterval(format!(
                "end {new_end} precedes onset {new_onset}"
            )));
        }
        self.check_interval(new_onset, new_end - new_onset)?;

        if self.modes.snap {
            let nested = self
                .annotations
                .iter()
                .any(|a| a.id != id && a.label == label && a.contains_strictly(new_onset, new_end));
            if nested {
                return Err(SessionError::InvalidInterval(format!(
                    "interval [{new_onset}, {new_end}) would nest inside another \
                     '{label}' annotation (disallowed while snap is on)"
                )));
            }
        }

        self.annotations
            .set_bounds(id, new_onset, new_end)
            .ok_or(SessionError::NotFound(id))
    }

    /// Remove `id` unconditionally. `NotFound` is the only failure.
    pub fn delete_annotation(&mut self, id: AnnotationId) -> Result<Annotation> {
        self.annotations.remove(id).ok_or(SessionError::NotFound(id))
    }

    // -- bad channels -------------------------------------------------------

    /// Flag a channel for exclusion. Returns whether the set changed.
    pub fn mark_channel_bad(&mut self, name: &str) -> Result<bool> {
        self.check_channel(name)?;
        Ok(self.bad_channels.insert(name.to_string()))
    }

    /// Clear a channel's exclusion flag. Returns whether the set changed.
    pub fn unmark_channel_bad(&mut self, name: &str) -> Result<bool> {
        self.check_channel(name)?;
        Ok(self.bad_channels.remove(name))
    }

    pub fn is_channel_bad(&self, name: &str) -> bool {
        self.bad_channels.contains(name)
    }

    // -- persistence --------------------------------------------------------

    /// Save the annotation collection to `path`. `.csv` selects the
    /// absolute-onset convention; everything else is relative seconds.
    pub fn save_annotations(&self, path: &Path, overwrite: bool) -> Result<()> {
        let convention = OnsetConvention::for_path(path, self.buffer.meas_start())?;
        io::save_annotations(path, &self.annotations, convention, overwrite)
    }

    /// Replace the annotation collection from `path`. The file is fully
    /// parsed and validated against the buffer before any state changes.
    ///
    /// An absolute-onset (`.csv`) file cannot be interpreted without the
    /// recording's measurement start, so that case is a `ParseError` here;
    /// on the save path the same condition is an `InvalidInterval`.
    pub fn load_annotations(&mut self, path: &Path) -> Result<()> {
        let convention =
            OnsetConvention::for_path(path, self.buffer.meas_start()).map_err(|_| {
                SessionError::parse(
                    0,
                    "absolute-onset (.csv) file but the recording has no measurement start",
                )
            })?;
        let triples = io::load_annotations(path, convention)?;
        for &(onset, duration, _) in &triples {
            self.check_interval(onset, duration)?;
        }
        self.annotations.replace_all(triples);
        Ok(())
    }

    /// Save the bad-channel set to `path` as one comma-joined line.
    pub fn save_bad_channels(&self, path: &Path, overwrite: bool) -> Result<()> {
        io::save_bad_channels(path, &self.bad_channels, overwrite)
    }

    /// Replace the bad-channel set from `path`. Every name must be a channel
    /// of the buffer; an unknown name rejects the whole load.
    pub fn load_bad_channels(&mut self, path: &Path) -> Result<()> {
        let names = io::load_bad_channels(path)?;
        for name in &names {
            self.check_channel(name)?;
        }
        self.bad_channels = names.into_iter().collect();
        Ok(())
    }

    // -- validation ---------------------------------------------------------

    fn check_interval(&self, onset: f64, duration: f64) -> Result<()> {
        if !onset.is_finite() || !duration.is_finite() || onset < 0.0 || duration < 0.0 {
            return Err(SessionError::InvalidInterval(format!(
                "onset {onset} / duration {duration} out of range"
            )));
        }
        let total = self.buffer.duration_secs();
        if onset + duration > total {
            return Err(SessionError::InvalidInterval(format!(
                "interval ends at {:.3} s but the recording is {:.3} s long",
                onset + duration,
                total
            )));
        }
        Ok(())
    }

    fn check_channel(&self, name: &str) -> Result<()> {
        if !self.buffer.has_channel(name) {
            return Err(SessionError::UnknownChannel(name.to_string()));
        }
        Ok(())
    }
}
