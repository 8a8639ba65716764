//! Utilities
//!
//! Hashing, time and file helpers shared by the stores.

mod fs;
mod hashing;
mod time;

pub use fs::{read_optional, write_atomic};
pub use hashing::{content_hash, hash_to_u64};
pub use time::{days_between, now_utc};
