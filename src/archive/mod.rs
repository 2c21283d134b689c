mod memory;
mod zip;

pub use memory::MemoryArchive;
pub use zip::ZipArchive;

use crate::error::Result;

/// A container of named entries, such as a CBZ file.
///
/// The core never touches storage directly; everything goes through this
/// trait. Listing order is significant: it is the order a reader would
/// enumerate the container's files in, and page correlation relies on it.
pub trait Archive {
    /// Display name of the container, for diagnostics.
    fn name(&self) -> &str;

    /// Whether the container can store arbitrarily named files. Formats
    /// that can't (e.g. plain image folders with fixed layouts) cannot hold
    /// file-based metadata.
    fn supports_files(&self) -> bool;

    /// All entry names in container order. Unreadable containers list as
    /// empty.
    fn entry_names(&self) -> Vec<String>;

    /// Read one entry's bytes.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Create or replace an entry. Returns whether the write took effect.
    fn write_entry(&mut self, name: &str, data: &[u8]) -> bool;

    /// Delete an entry. Returns whether an entry of that name existed.
    fn remove_entry(&mut self, name: &str) -> bool;
}
