//! ACBF (Advanced Comic Book Format) metadata support.
//!
//! ACBF stores comic metadata as an XML document inside the comic archive.
//! This module reads that document into a [`ComicMetadata`] record and
//! merges records back into it, preserving hand-authored structure the
//! record doesn't cover.

mod reader;
mod writer;
pub(crate) mod xml;

pub use reader::extract_metadata;
pub use writer::merge_metadata;
pub use xml::{parse_document, serialize_document, validate_root};

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::meta::{
    COLORIST_SYNONYMS, COVER_SYNONYMS, ComicMetadata, EDITOR_SYNONYMS, INKER_SYNONYMS,
    LETTERER_SYNONYMS, PENCILLER_SYNONYMS, TRANSLATOR_SYNONYMS, WRITER_SYNONYMS,
};
use crate::tag::Tag;
use crate::util::page_name_list;

/// Root element name of an ACBF document.
pub const ACBF_ROOT: &str = "ACBF";

/// Schema versions this adapter knows how to merge into.
pub const NS_ACBF_1_1: &str = "http://www.acbf.info/xml/acbf/1.1";
pub const NS_ACBF_1_2: &str = "http://www.acbf.info/xml/acbf/1.2";
pub const SUPPORTED_NAMESPACES: &[&str] = &[NS_ACBF_1_1, NS_ACBF_1_2];

/// Extension identifying the metadata entry within an archive.
pub const ACBF_EXTENSION: &str = ".acbf";

/// Entry name used when the archive has no ACBF entry yet.
pub const DEFAULT_ENTRY_NAME: &str = "comic_metadata.acbf";

/// Marker prefixing the scan-info paragraph in document-info/source.
pub const SCAN_MARKER: &str = "[Scan]";

/// Find the archive entry holding ACBF metadata, if any.
///
/// Pure discovery: the result is threaded through each call instead of
/// being cached, so adapters stay stateless.
pub fn find_entry(archive: &dyn Archive) -> Option<String> {
    archive
        .entry_names()
        .into_iter()
        .find(|name| name.ends_with(ACBF_EXTENSION))
}

/// The ACBF tag format.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcbfTag;

impl AcbfTag {
    pub fn new() -> Self {
        Self
    }

    /// Whether a credit role maps onto a dedicated ACBF activity (rather
    /// than falling through to "Other").
    pub fn supports_credit_role(&self, role: &str) -> bool {
        let role = role.to_lowercase();
        [
            WRITER_SYNONYMS,
            PENCILLER_SYNONYMS,
            INKER_SYNONYMS,
            COLORIST_SYNONYMS,
            LETTERER_SYNONYMS,
            COVER_SYNONYMS,
            EDITOR_SYNONYMS,
            TRANSLATOR_SYNONYMS,
        ]
        .iter()
        .any(|table| table.contains(&role.as_str()))
            || ["adapter", "photographer", "assistant editor", "other"].contains(&role.as_str())
    }
}

impl Tag for AcbfTag {
    fn name(&self) -> &'static str {
        "ACBF"
    }

    fn supports(&self, archive: &dyn Archive) -> bool {
        archive.supports_files()
    }

    fn exists(&self, archive: &mut dyn Archive) -> bool {
        if !archive.supports_files() {
            return false;
        }
        let Some(entry) = find_entry(archive) else {
            return false;
        };
        match archive.read_entry(&entry) {
            Ok(bytes) => parse_document(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    fn read(&self, archive: &mut dyn Archive) -> ComicMetadata {
        let Some(entry) = find_entry(archive) else {
            return ComicMetadata::default();
        };
        let bytes = match archive.read_entry(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("unable to read {entry} from {}: {err}", archive.name());
                return ComicMetadata::default();
            }
        };
        match parse_document(&bytes) {
            Ok(root) => extract_metadata(&root, &page_name_list(&archive.entry_names())),
            Err(err) => {
                log::warn!("ignoring ACBF metadata in {}: {err}", archive.name());
                ComicMetadata::default()
            }
        }
    }

    fn read_raw(&self, archive: &mut dyn Archive) -> Result<String> {
        let Some(entry) = find_entry(archive) else {
            return Ok(String::new());
        };
        let bytes = archive.read_entry(&entry)?;
        let root = parse_document(&bytes)?;
        Ok(String::from_utf8(serialize_document(&root)?)?)
    }

    fn write(&self, metadata: &ComicMetadata, archive: &mut dyn Archive) -> Result<()> {
        if !archive.supports_files() {
            log::warn!(
                "archive {} does not support {} metadata",
                archive.name(),
                self.name()
            );
            return Err(Error::UnsupportedArchive);
        }

        // A present-but-unusable entry must surface rather than be silently
        // replaced; a newer schema version especially so.
        let entry = find_entry(archive);
        let base = match &entry {
            Some(name) => Some(parse_document(&archive.read_entry(name)?)?),
            None => None,
        };

        let root = merge_metadata(metadata, base);
        let bytes = serialize_document(&root)?;
        let name = entry.unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
        if archive.write_entry(&name, &bytes) {
            Ok(())
        } else {
            Err(Error::ArchiveWrite(name))
        }
    }

    fn remove(&self, archive: &mut dyn Archive) -> bool {
        if !self.exists(archive) {
            return false;
        }
        match find_entry(archive) {
            Some(entry) => archive.remove_entry(&entry),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    #[test]
    fn test_find_entry() {
        let mut archive = MemoryArchive::new("test.cbz");
        archive.add_entry("page01.jpg", vec![0]);
        archive.add_entry("meta.acbf", b"<ACBF/>".to_vec());
        assert_eq!(find_entry(&archive), Some("meta.acbf".to_string()));

        let empty = MemoryArchive::new("empty.cbz");
        assert_eq!(find_entry(&empty), None);
    }

    #[test]
    fn test_supports_credit_role() {
        let tag = AcbfTag::new();
        assert!(tag.supports_credit_role("Writer"));
        assert!(tag.supports_credit_role("PLOTTER"));
        assert!(tag.supports_credit_role("cover artist"));
        assert!(tag.supports_credit_role("adapter"));
        assert!(!tag.supports_credit_role("best boy"));
    }

    #[test]
    fn test_exists_requires_valid_document() {
        let tag = AcbfTag::new();

        let mut archive = MemoryArchive::new("test.cbz");
        archive.add_entry("meta.acbf", b"<ACBF><body/></ACBF>".to_vec());
        assert!(tag.exists(&mut archive));

        let mut wrong = MemoryArchive::new("wrong.cbz");
        wrong.add_entry("meta.acbf", b"<Comic/>".to_vec());
        assert!(!tag.exists(&mut wrong));

        let mut broken = MemoryArchive::new("broken.cbz");
        broken.add_entry("meta.acbf", b"<ACBF".to_vec());
        assert!(!tag.exists(&mut broken));
    }
}
