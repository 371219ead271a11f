//! Output generation for completed runs.

pub mod report;
