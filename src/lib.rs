//! ntfsview — a read-only decoder for the NTFS on-disk file system format.
//!
//! Given a raw NTFS volume, exposed through the [`device::BlockReader`]
//! abstraction, this crate locates the Master File Table, decodes file
//! records, exposes their attributes in structured form, and reads file
//! content by resolving non-resident data runs into physical byte ranges.
//! It does not write, journal, or repair anything; see each module's docs
//! for exactly which features are in scope.

pub mod arena;
pub mod attr;
pub mod device;
pub mod error;
pub mod file;
pub mod record;
pub mod runlist;
pub mod volume;

pub use error::NtfsError;
pub use file::File;
pub use volume::Volume;
