use std::fmt;

// ---------------------------------------------------------------------------
// Annotation – a labeled time interval over the buffer
// ---------------------------------------------------------------------------

/// Stable handle to an annotation, assigned by the owning list.
/// Ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(pub(crate) u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A labeled interval `[onset, onset + duration)` in seconds from buffer start.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub onset: f64,
    pub duration: f64,
    pub label: String,
    /// Derived once at creation from a case-insensitive `"bad"` label prefix.
    /// Downstream consumers read this flag instead of re-parsing the label.
    pub excluded: bool,
}

impl Annotation {
    /// End of the interval (exclusive).
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }

    /// Half-open interval overlap. Touching intervals do not overlap.
    pub fn overlaps(&self, onset: f64, end: f64) -> bool {
        self.onset < end && onset < self.end()
    }

    /// Whether `[onset, end)` lies entirely inside this annotation and is
    /// strictly smaller than it.
    pub fn contains_strictly(&self, onset: f64, end: f64) -> bool {
        self.onset <= onset && end <= self.end() && (self.onset < onset || end < self.end())
    }
}

/// Labels with a case-insensitive `"bad"` prefix mark intervals that
/// downstream analysis excludes.
pub fn label_is_excluded(label: &str) -> bool {
    // get() instead of slicing: labels may start with a multi-byte char.
    label.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("bad"))
}

// ---------------------------------------------------------------------------
// AnnotationList – ordered collection with the label-scoped merge invariant
// ---------------------------------------------------------------------------

/// Time-ordered annotation collection.
///
/// Invariant maintained by every mutation: no two annotations with the same
/// label overlap. Overlapping same-label inserts are merged into the union
/// interval; merging never crosses labels.
#[derive(Debug, Clone, Default)]
pub struct AnnotationList {
    items: Vec<Annotation>,
    next_id: u64,
}

impl AnnotationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    /// Insert an interval, merging it with every overlapping annotation of
    /// the same label. Returns the id of the surviving annotation.
    ///
    /// The caller has already validated the interval against the buffer.
    pub fn insert_merged(&mut self, onset: f64, duration: f64, label: &str) -> AnnotationId {
        let mut lo = onset;
        let mut hi = onset + duration;

        // Absorb every same-label overlap into the union interval. A single
        // insert can bridge several existing annotations.
        self.items.retain(|a| {
            if a.label == label && a.overlaps(lo, hi) {
                lo = lo.min(a.onset);
                hi = hi.max(a.end());
                false
            } else {
                true
            }
        });

        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        self.items.push(Annotation {
            id,
            onset: lo,
            duration: hi - lo,
            label: label.to_string(),
            excluded: label_is_excluded(label),
        });
        self.sort();
        id
    }

    /// Replace the bounds of `id`, then re-merge same-label overlaps so the
    /// invariant holds after the edit. Returns the surviving id (the edited
    /// annotation may absorb neighbours).
    pub fn set_bounds(&mut self, id: AnnotationId, new_onset: f64, new_end: f64) -> Option<AnnotationId> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        let label = self.items[idx].label.clone();

        let mut lo = new_onset;
        let mut hi = new_end;
        self.items.retain(|a| {
            if a.id != id && a.label == label && a.overlaps(lo, hi) {
                lo = lo.min(a.onset);
                hi = hi.max(a.end());
                false
            } else {
                true
            }
        });

        // Indices may have shifted after retain.
        let a = self.items.iter_mut().find(|a| a.id == id)?;
        a.onset = lo;
        a.duration = hi - lo;
        self.sort();
        Some(id)
    }

    /// Remove `id`. Returns the removed annotation, `None` when absent.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Discard all annotations and rebuild from `(onset, duration, label)`
    /// triples, re-applying the merge invariant. Used by `load`.
    pub fn replace_all(&mut self, triples: impl IntoIterator<Item = (f64, f64, String)>) {
        self.items.clear();
        for (onset, duration, label) in triples {
            self.insert_merged(onset, duration, &label);
        }
    }

    /// Any annotation of `label` strictly containing `[onset, end)`?
    pub fn strictly_containing(&self, onset: f64, end: f64, label: Option<&str>) -> Option<&Annotation> {
        self.items.iter().find(|a| {
            label.map_or(true, |l| a.label == l) && a.contains_strictly(onset, end)
        })
    }

    /// Sorted unique labels, for the UI's label selector and color map.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.items.iter().map(|a| a.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    fn sort(&mut self) {
        self.items
            .sort_by(|a, b| a.onset.total_cmp(&b.onset).then(a.label.cmp(&b.label)));
    }
}
