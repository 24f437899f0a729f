pub mod error;
pub mod output;
pub mod types;

pub use error::{RefRepathError, Result};
pub use types::{FileCause, FileStatus, ReferenceRecord, ReferenceStatus};
