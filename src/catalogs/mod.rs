//! Readers for plate-solver match tables.

mod corr;

pub use corr::read_matches_csv;
