//! Response verification: static checks and before/after deltas

pub mod dynamic;
pub mod response;

pub use response::{check_content, check_status, verify_content, verify_status};
