pub mod allocations;
pub mod auth;
pub mod computers;
pub mod core;
pub mod students;
