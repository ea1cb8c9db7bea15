pub mod core;
pub mod grading;
pub mod reports;
pub mod scales;
