//! # ConstKV
//!
//! A constant key-value database: written once, then read many times.
//! - Immutable on-disk hash table with O(1) point lookups
//! - Streaming writer that never buffers record data in memory
//! - Readers over files or in-memory buffers, safe to share across threads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   put    ┌──────────────┐  freeze   ┌──────────────┐
//! │    Caller    ├─────────►│    Writer    ├──────────►│    Reader    │
//! └──────────────┘          │ (Write+Seek) │           │   (ReadAt)   │
//!                           └──────┬───────┘           └──────┬───────┘
//!                                  │ records, tables,         │ header,
//!                                  │ header                   │ probes
//!                                  ▼                          ▼
//!                           ┌─────────────────────────────────────────┐
//!                           │ [Header 2048B][Records...][Tables...]   │
//!                           └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use constkv::Writer;
//!
//! let mut writer = Writer::new(Cursor::new(Vec::new()))?;
//! writer.put(b"foo", b"bar")?;
//! let reader = writer.freeze()?;
//!
//! assert_eq!(reader.get(b"foo")?.as_deref(), Some(&b"bar"[..]));
//! assert_eq!(reader.get(b"baz")?, None);
//! # Ok::<(), constkv::Error>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hash;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Error, Result};
pub use config::Config;
pub use storage::{Reader, Writer};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ConstKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
