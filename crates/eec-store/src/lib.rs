//! Durable submission records.
//!
//! The [`RecordStore`] trait is the only way lifecycle code reads or writes
//! submission state. Two backends ship with eec:
//!
//! - [`MemoryRecordStore`]: process-local, for tests and single-run CLI use
//! - [`FileRecordStore`]: one directory per record, survives restarts
//!
//! [`ServeLock`] keeps a second supervisor from serving the same store root.

mod file;
mod lock;
mod memory;
mod record;
mod traits;

pub use file::FileRecordStore;
pub use lock::{LOCK_FILE_NAME, LockInfo, ServeLock};
pub use memory::MemoryRecordStore;
pub use record::{RecordField, SubmissionRecord, SubmissionStatus, encode_flag, encode_time};
pub use traits::RecordStore;
