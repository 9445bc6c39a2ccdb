/// Data layer: core types and file readers.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json        .bed / .tsv           .txt
///        │                            │                    │
///        ▼                            ▼                    ▼
///   ┌──────────┐              ┌────────────┐        ┌────────────┐
///   │  loader   │ FeatureTable │ intervals  │ Vec<   │   loader    │ Vec<String>
///   └──────────┘              └────────────┘ Interval>└────────────┘
///        │                            │                    │
///        └──────────────┬─────────────┴────────────────────┘
///                       ▼
///                 ┌──────────┐
///                 │ datasets  │  index → Example { inputs, targets, metadata }
///                 └──────────┘
/// ```

pub mod intervals;
pub mod loader;
pub mod model;
