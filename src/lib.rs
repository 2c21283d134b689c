//! # comicmeta
//!
//! A library for reading and writing comic-book metadata stored inside
//! comic archives, built around one normalized record that every tag
//! format converts to and from.
//!
//! ## Features
//!
//! - Read and write ACBF metadata embedded in CBZ archives
//! - Merge new metadata into hand-authored documents without destroying
//!   unrelated structure
//! - Format-agnostic [`ComicMetadata`] record shared by all tag formats
//! - Archive abstraction with ZIP and in-memory backends
//!
//! ## Quick Start
//!
//! ```no_run
//! use comicmeta::{AcbfTag, Tag, ZipArchive};
//!
//! let mut archive = ZipArchive::open("comic.cbz")?;
//! let tag = AcbfTag::new();
//!
//! if tag.exists(&mut archive) {
//!     let metadata = tag.read(&mut archive);
//!     println!("Series: {:?}", metadata.series);
//! }
//! # Ok::<(), comicmeta::Error>(())
//! ```
//!
//! ## Writing Metadata
//!
//! The [`ComicMetadata`] record is the central data type; build one and
//! hand it to a tag format:
//!
//! ```no_run
//! use comicmeta::{AcbfTag, ComicMetadata, Tag, ZipArchive};
//!
//! let mut metadata = ComicMetadata::new()
//!     .with_series("Hellboy")
//!     .with_issue("8");
//! metadata.add_credit("Mike Mignola", "Writer", "");
//! metadata.add_page("cover.jpg", 0);
//!
//! let mut archive = ZipArchive::open("comic.cbz")?;
//! AcbfTag::new().write(&metadata, &mut archive)?;
//! # Ok::<(), comicmeta::Error>(())
//! ```

pub mod acbf;
pub mod archive;
pub mod error;
pub mod meta;
pub mod tag;
pub mod util;

pub use acbf::AcbfTag;
pub use archive::{Archive, MemoryArchive, ZipArchive};
pub use error::{Error, Result};
pub use meta::{ComicMetadata, CreditEntry, DataOrigin, PageEntry};
pub use tag::Tag;
