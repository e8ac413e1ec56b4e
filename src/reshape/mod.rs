//! Aggregation over normalized records: pivots, derived totals, classification.

pub mod classify;
pub mod pivot;
pub mod records;
pub mod totals;
pub mod yoy;

pub use pivot::{pivot_first, Pivot, PivotRow};
pub use records::NormalizedRecord;
pub use totals::GenerationMix;
