use sigmark::data::model::{Channel, SignalBuffer};
use sigmark::session::{Session, SessionError};

fn buffer(names: &[&str], secs: f64, sfreq: f64, meas_start: Option<f64>) -> SignalBuffer {
    let n = (secs * sfreq) as usize;
    let channels = names
        .iter()
        .map(|&name| Channel {
            name: name.to_string(),
            samples: vec![0.0; n],
        })
        .collect();
    SignalBuffer::new(channels, sfreq, meas_start)
}

fn session() -> Session {
    Session::new(buffer(&["Fp1", "Fp2", "Cz", "Oz"], 30.0, 128.0, None))
}

fn triples(s: &Session) -> Vec<(f64, f64, String)> {
    s.annotations()
        .iter()
        .map(|a| (a.onset, a.duration, a.label.clone()))
        .collect()
}

#[test]
fn save_load_round_trip_reproduces_the_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.txt");

    let mut original = session();
    original.create_annotation(2.0, 1.5, "BAD_blink").unwrap();
    original.create_annotation(10.0, 0.25, "stimulus").unwrap();
    original.create_annotation(12.5, 3.0, "rest").unwrap();
    original.save_annotations(&path, false).unwrap();

    let mut fresh = session();
    fresh.load_annotations(&path).unwrap();
    assert_eq!(triples(&fresh), triples(&original));
}

#[test]
fn round_trip_through_absolute_onset_convention() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.csv");

    let mut original = Session::new(buffer(&["Fp1"], 30.0, 128.0, Some(1_700_000_000.0)));
    original.create_annotation(5.0, 2.0, "BAD").unwrap();
    original.save_annotations(&path, false).unwrap();

    // On disk the onset is absolute.
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("1700000005"), "unexpected file: {text}");

    let mut fresh = Session::new(buffer(&["Fp1"], 30.0, 128.0, Some(1_700_000_000.0)));
    fresh.load_annotations(&path).unwrap();
    assert_eq!(triples(&fresh), triples(&original));
}

#[test]
fn absolute_convention_without_meas_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.csv");

    let mut s = session();
    s.create_annotation(5.0, 2.0, "BAD").unwrap();
    assert!(matches!(
        s.save_annotations(&path, false),
        Err(SessionError::InvalidInterval(_))
    ));
    assert!(!path.exists());
}

#[test]
fn second_save_needs_the_overwrite_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.txt");

    let mut s = session();
    s.create_annotation(1.0, 1.0, "first").unwrap();
    s.save_annotations(&path, false).unwrap();

    s.create_annotation(5.0, 1.0, "second").unwrap();
    assert!(matches!(
        s.save_annotations(&path, false),
        Err(SessionError::FileExists(_))
    ));

    s.save_annotations(&path, true).unwrap();
    let mut fresh = session();
    fresh.load_annotations(&path).unwrap();
    assert_eq!(triples(&fresh), triples(&s));
}

#[test]
fn malformed_row_leaves_prior_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.txt");
    std::fs::write(&path, "onset,duration,description\nabc,1.0,BAD\n").unwrap();

    let mut s = session();
    s.create_annotation(1.0, 1.0, "keep").unwrap();
    assert!(matches!(
        s.load_annotations(&path),
        Err(SessionError::ParseError { .. })
    ));
    assert_eq!(triples(&s), vec![(1.0, 1.0, "keep".to_string())]);
}

#[test]
fn merge_invariant_survives_arbitrary_create_sequences() {
    let mut s = session();
    let script = [
        (0.0, 2.0, "BAD"),
        (1.5, 1.0, "BAD"),
        (1.5, 1.0, "blink"),
        (5.0, 0.5, "BAD"),
        (4.9, 0.7, "BAD"),
        (10.0, 4.0, "blink"),
        (9.0, 2.0, "blink"),
    ];
    for (onset, duration, label) in script {
        s.create_annotation(onset, duration, label).unwrap();
    }

    let all: Vec<_> = s.annotations().iter().collect();
    for a in &all {
        for b in &all {
            if a.id != b.id && a.label == b.label {
                assert!(
                    !a.overlaps(b.onset, b.end()),
                    "same-label overlap: {a:?} / {b:?}"
                );
            }
        }
    }
}

#[test]
fn bad_channels_persist_and_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording.bads");

    let mut s = session();
    s.mark_channel_bad("Cz").unwrap();
    s.mark_channel_bad("Fp2").unwrap();
    s.save_bad_channels(&path, false).unwrap();

    let mut fresh = session();
    fresh.load_bad_channels(&path).unwrap();
    assert_eq!(*fresh.bad_channels(), *s.bad_channels());

    // Loading the same file into a session whose buffer lacks the channels
    // is rejected without touching the set.
    let mut other = Session::new(buffer(&["EMG1"], 30.0, 128.0, None));
    other.mark_channel_bad("EMG1").unwrap();
    assert!(matches!(
        other.load_bad_channels(&path),
        Err(SessionError::UnknownChannel(_))
    ));
    assert_eq!(other.bad_channels().len(), 1);
}

#[test]
fn exclusion_mechanisms_are_orthogonal() {
    let mut s = session();
    // A bad channel and a "bad" annotation over the same stretch of signal
    // are tracked independently.
    s.mark_channel_bad("Cz").unwrap();
    let id = s.create_annotation(3.0, 2.0, "BAD_segment").unwrap();

    s.unmark_channel_bad("Cz").unwrap();
    assert!(s.annotations().get(id).is_some());

    s.delete_annotation(id).unwrap();
    assert!(s.bad_channels().is_empty());
}
