// Authentication: Argon2 password accounts, hashed bearer sessions, role checks.
// Back-office routes take an `AdminUser` extractor; public routes take nothing.

pub mod accounts;
pub mod extract;
pub mod handlers;
pub mod password;
pub mod sessions;

pub use extract::{AdminUser, CurrentUser};
