use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::Archive;
use crate::error::Result;

/// A CBZ/ZIP [`Archive`] on disk.
///
/// Mutation rewrites the whole container: entries are copied into a sibling
/// temp file with the change applied, which then replaces the original. The
/// ZIP format has no cheap in-place delete, and a failed rewrite must not
/// corrupt the source.
pub struct ZipArchive {
    path: PathBuf,
    display_name: String,
}

impl ZipArchive {
    /// Open an existing ZIP container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Fail early on unreadable or non-ZIP files.
        let file = File::open(&path)?;
        zip::ZipArchive::new(file)?;

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Ok(Self { path, display_name })
    }

    /// Create an empty ZIP container at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        ZipWriter::new(file).finish()?;
        Self::open(path)
    }

    fn rewrite(&self, skip: &str, append: Option<(&str, &[u8])>) -> Result<()> {
        let file = File::open(&self.path)?;
        let mut source = zip::ZipArchive::new(file)?;

        let tmp_path = self.path.with_file_name(format!("{}.tmp", self.display_name));
        let mut writer = ZipWriter::new(File::create(&tmp_path)?);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..source.len() {
            let mut entry = source.by_index(i)?;
            if entry.name() == skip {
                continue;
            }
            writer.start_file(entry.name().to_string(), options)?;
            std::io::copy(&mut entry, &mut writer)?;
        }

        if let Some((name, data)) = append {
            writer.start_file(name, options)?;
            writer.write_all(data)?;
        }

        writer.finish()?;
        drop(source);
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl Archive for ZipArchive {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn supports_files(&self) -> bool {
        true
    }

    fn entry_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(file) = File::open(&self.path) else {
            return names;
        };
        let Ok(mut archive) = zip::ZipArchive::new(file) else {
            return names;
        };
        // by_index preserves central-directory order; file_names() does not.
        for i in 0..archive.len() {
            match archive.by_index(i) {
                Ok(entry) => names.push(entry.name().to_string()),
                Err(err) => {
                    log::warn!("skipping unreadable entry {i} in {}: {err}", self.display_name);
                }
            }
        }
        names
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let file = File::open(&self.path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = archive.by_name(name)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> bool {
        match self.rewrite(name, Some((name, data))) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to write {name} to {}: {err}", self.display_name);
                false
            }
        }
    }

    fn remove_entry(&mut self, name: &str) -> bool {
        if !self.entry_names().iter().any(|n| n == name) {
            return false;
        }
        match self.rewrite(name, None) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to remove {name} from {}: {err}", self.display_name);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, entries: &[(&str, &[u8])]) -> ZipArchive {
        let path = dir.path().join("test.cbz");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
        ZipArchive::open(path).unwrap()
    }

    #[test]
    fn test_entry_names_in_order() {
        let dir = TempDir::new().unwrap();
        let archive = fixture(&dir, &[("b.jpg", b"b"), ("a.jpg", b"a")]);
        assert_eq!(archive.entry_names(), vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let mut archive = fixture(&dir, &[("page1.jpg", b"x")]);
        assert!(archive.write_entry("meta.acbf", b"<ACBF/>"));
        assert_eq!(archive.read_entry("meta.acbf").unwrap(), b"<ACBF/>");
        assert_eq!(archive.entry_names(), vec!["page1.jpg", "meta.acbf"]);
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let mut archive = fixture(&dir, &[("meta.acbf", b"old")]);
        assert!(archive.write_entry("meta.acbf", b"new"));
        assert_eq!(archive.read_entry("meta.acbf").unwrap(), b"new");
        assert_eq!(archive.entry_names().len(), 1);
    }

    #[test]
    fn test_remove_entry() {
        let dir = TempDir::new().unwrap();
        let mut archive = fixture(&dir, &[("page1.jpg", b"x"), ("meta.acbf", b"m")]);
        assert!(archive.remove_entry("meta.acbf"));
        assert!(!archive.remove_entry("meta.acbf"));
        assert_eq!(archive.entry_names(), vec!["page1.jpg"]);
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not.cbz");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(ZipArchive::open(path).is_err());
    }
}
