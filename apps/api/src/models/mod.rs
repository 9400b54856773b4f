pub mod admissions;
pub mod content;
pub mod user;
