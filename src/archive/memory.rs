use crate::archive::Archive;
use crate::error::{Error, Result};

/// An in-memory [`Archive`] backed by ordered `(name, bytes)` pairs.
///
/// Useful for building archives programmatically and in tests. Insertion
/// order is the listing order; replacing an entry keeps its position.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    name: String,
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry, replacing any existing entry of the same name in
    /// place.
    pub fn add_entry(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name, data)),
        }
    }
}

impl Archive for MemoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_files(&self) -> bool {
        true
    }

    fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no entry named {name}"),
                ))
            })
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> bool {
        self.add_entry(name, data.to_vec());
        true
    }

    fn remove_entry(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_preserves_order() {
        let mut archive = MemoryArchive::new("test");
        archive.add_entry("b.jpg", vec![1]);
        archive.add_entry("a.jpg", vec![2]);
        assert_eq!(archive.entry_names(), vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut archive = MemoryArchive::new("test");
        archive.add_entry("a.jpg", vec![1]);
        archive.add_entry("b.jpg", vec![2]);
        assert!(archive.write_entry("a.jpg", &[3]));
        assert_eq!(archive.entry_names(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(archive.read_entry("a.jpg").unwrap(), vec![3]);
    }

    #[test]
    fn test_remove() {
        let mut archive = MemoryArchive::new("test");
        archive.add_entry("a.jpg", vec![1]);
        assert!(archive.remove_entry("a.jpg"));
        assert!(!archive.remove_entry("a.jpg"));
        assert!(archive.entry_names().is_empty());
    }

    #[test]
    fn test_read_missing_entry() {
        let mut archive = MemoryArchive::new("test");
        assert!(archive.read_entry("nope.jpg").is_err());
    }
}
