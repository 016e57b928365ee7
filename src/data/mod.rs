/// Data layer: core types, loading, and cleaning.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → PanelTable
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ PanelTable  │  Vec<PanelRow>, column index
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  year window, variant drop, null thresholds
///   └──────────┘
/// ```

pub mod clean;
pub mod loader;
pub mod model;
