//! Power-law scaling analysis over national panel indicators.
//!
//! The pipeline mirrors urban-scaling methodology at country granularity:
//! clean a wide (country × year × indicator) table, derive log columns,
//! fit an OLS line per configured pair (the slope is the scaling exponent),
//! and emit a scatter-plus-fit PNG per pair.

pub mod config;
pub mod data;
pub mod error;
pub mod fit;
pub mod pipeline;
pub mod plot;
pub mod render;
pub mod transform;
pub mod units;
