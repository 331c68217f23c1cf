/// Display-mode flags for the interactive session.
///
/// These are independent toggles, not an exclusive state machine:
/// `butterfly` and `zen` combine freely with `annotating`. Only `annotating`
/// gates which mutations the interactive surface forwards (creation and
/// bound edits); deletion and channel marking are reachable in any mode.
/// None of the flags affect data integrity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewModes {
    /// Annotation mode: click-drag creates intervals, bound edits enabled.
    pub annotating: bool,
    /// All channels overlaid at a shared baseline instead of stacked.
    pub butterfly: bool,
    /// Distraction-free view: side panel hidden.
    pub zen: bool,
    /// Selects the nested-interval policy: with snap on, bound edits may not
    /// nest an annotation inside a same-label neighbour; with snap off,
    /// creating inside an existing annotation is the disallowed case.
    pub snap: bool,
}
