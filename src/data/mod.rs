/// Data layer: the immutable recording and its loaders.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SignalBuffer
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SignalBuffer  │  Vec<Channel>, sfreq, meas_start
///   └──────────────┘
///        │
///        ▼
///   read-only input to the annotation session and the plot
/// ```

pub mod loader;
pub mod model;
