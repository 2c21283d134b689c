//! The seam between the tagging toolset and a metadata format.

use crate::archive::Archive;
use crate::error::Result;
use crate::meta::ComicMetadata;

/// A metadata format that can be stored in and retrieved from a comic
/// archive.
///
/// Implementations are stateless: entry discovery happens per call, so one
/// adapter value can serve any number of independent archives.
pub trait Tag {
    /// Short display name of the format, e.g. `"ACBF"`.
    fn name(&self) -> &'static str;

    /// Whether this format can be stored in the given archive at all.
    fn supports(&self, archive: &dyn Archive) -> bool;

    /// Whether the archive currently holds a valid document of this format.
    fn exists(&self, archive: &mut dyn Archive) -> bool;

    /// Read metadata, returning an empty record when none is present or the
    /// stored document is unusable.
    fn read(&self, archive: &mut dyn Archive) -> ComicMetadata;

    /// Re-serialize the stored document as display text. Empty when no
    /// entry exists; parse and validation failures surface as errors.
    fn read_raw(&self, archive: &mut dyn Archive) -> Result<String>;

    /// Merge the record into the archive's stored document (or a fresh one)
    /// and write it back.
    fn write(&self, metadata: &ComicMetadata, archive: &mut dyn Archive) -> Result<()>;

    /// Delete the format's entry from the archive. Returns whether an entry
    /// was removed.
    fn remove(&self, archive: &mut dyn Archive) -> bool;
}
