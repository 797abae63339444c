//! Source extractors for the hoard repository catalogue.
//!
//! Each extractor turns one external dump format into a stream of
//! [`SourceRecord`]s. Errors for individual rows or events are yielded in
//! the stream and are recoverable (see [`Error::is_recoverable`]); I/O errors
//! end it.

pub mod archive;
pub mod csv;
pub mod dump;
pub mod error;
pub mod ghtorrent;
pub mod lang;
pub mod time;

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use flate2::read::MultiGzDecoder;
use hoard_core::source::{SourceKind, SourceRecord};
use serde::de::DeserializeOwned;

pub use error::{Error, Result};
pub use ghtorrent::ProjectIndex;

/// A boxed stream of extracted records.
pub type Records<'a> = Box<dyn Iterator<Item = Result<SourceRecord>> + 'a>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open `path` for line-oriented reading, transparently decompressing gzip
/// (detected by magic bytes, not by extension).
pub fn open_input(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
  let mut reader = BufReader::new(File::open(path)?);
  let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
  if gzipped {
    Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
  } else {
    Ok(Box::new(reader))
  }
}

/// Extract records of `kind` from `reader`.
///
/// `ghtorrent-projects` and `ghtorrent-languages` need the `projects.csv`
/// index to translate GHTorrent ids into paths.
pub fn records<'a>(
  kind: SourceKind,
  reader: impl BufRead + 'a,
  index: Option<&'a ProjectIndex>,
) -> Result<Records<'a>> {
  Ok(match kind {
    SourceKind::GhtorrentProjects => {
      let index = index.ok_or(Error::MissingProjectIndex(kind))?;
      Box::new(ghtorrent::project_records(reader, index))
    }
    SourceKind::GhtorrentLanguages => {
      let index = index.ok_or(Error::MissingProjectIndex(kind))?;
      Box::new(ghtorrent::language_records(reader, index)?.into_iter())
    }
    SourceKind::GhtorrentDump => Box::new(dump::dump_records(reader)),
    SourceKind::ArchiveEvents => Box::new(archive::archive_records(reader)),
  })
}

/// Whether extracting `kind` requires a [`ProjectIndex`].
pub fn needs_project_index(kind: SourceKind) -> bool {
  matches!(kind, SourceKind::GhtorrentProjects | SourceKind::GhtorrentLanguages)
}

/// Parse each non-blank line as JSON, pairing values with their 1-based line
/// numbers. Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn json_lines<'a, R, T>(reader: R) -> impl Iterator<Item = Result<(u64, T)>> + 'a
where
  R: BufRead + 'a,
  T: DeserializeOwned + 'a,
{
  reader
    .split(b'\n')
    .zip(1u64..)
    .filter_map(|(bytes, line)| {
      let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => return Some(Err(Error::Io(e))),
      };
      let text = String::from_utf8_lossy(&bytes);
      let text = text.trim();
      if text.is_empty() {
        return None;
      }
      Some(
        serde_json::from_str(text)
          .map(|value| (line, value))
          .map_err(|source| Error::Json { line, source }),
      )
    })
}
