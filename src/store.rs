//! # Store
//!
//! Provider implementations. [`fs::FsProvider`] is the durable reference:
//! one JSON file per record under a filesystem root, written atomically
//! (temp file, fsync, rename) so readers never observe a partial file.
//! [`memory::MemoryProvider`] keeps everything in process memory and backs
//! tests and local experimentation.

pub mod fs;
pub mod memory;

pub use fs::FsProvider;
pub use memory::MemoryProvider;
