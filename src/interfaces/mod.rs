//! Boundary formats: CSV catalog import and stock export.

pub mod csv;
