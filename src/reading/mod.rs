//! Raw input parsing: grids, headers, labels, coercion and layout descriptors.

pub mod coerce;
pub mod grid;
pub mod header;
pub mod labels;
pub mod layout;

pub use grid::{Cell, RawGrid};
pub use header::{HeaderFallback, HeaderFinder};
pub use layout::{reshape, CategorySource, Layout, MatchRule, PeriodRule, Shape};
