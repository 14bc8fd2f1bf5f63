//! Zip container: the table manifest plus `images/tree_<id>.<ext>` entries.

use std::{
  collections::BTreeMap,
  io::{Cursor, Read as _, Write as _},
};

use arbor_core::tree::{Photo, TreeId, content_type_for};
use tracing::debug;
use zip::{
  CompressionMethod, ZipArchive, ZipWriter, result::ZipError, write::SimpleFileOptions,
};

use crate::{
  MANIFEST_NAME,
  error::{Error, Result},
};

const IMAGE_PREFIX: &str = "images/tree_";

pub(crate) fn image_name(id: TreeId, photo: &Photo) -> String {
  format!("{IMAGE_PREFIX}{id}.{}", photo.extension())
}

/// Split `images/tree_<id>.<ext>` into its id and extension.
pub(crate) fn parse_image_name(name: &str) -> Option<(TreeId, &str)> {
  let rest = name.strip_prefix(IMAGE_PREFIX)?;
  let (id, ext) = rest.rsplit_once('.')?;
  if ext.is_empty() || ext.contains('/') {
    return None;
  }
  Some((id.parse().ok()?, ext))
}

pub(crate) fn write(table: &str, photos: &[(TreeId, Photo)]) -> Result<Vec<u8>> {
  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

  zip.start_file(MANIFEST_NAME, SimpleFileOptions::default())?;
  zip.write_all(table.as_bytes())?;

  for (id, photo) in photos {
    // Image payloads are already compressed.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file(image_name(*id, photo), stored)?;
    zip.write_all(&photo.data)?;
  }

  Ok(zip.finish()?.into_inner())
}

/// The decoded contents of a bundle.
#[derive(Debug, Default)]
pub(crate) struct Contents {
  pub table:  String,
  /// Photos keyed by the id encoded in their entry name.
  pub images: BTreeMap<TreeId, Photo>,
}

/// Read a bundle. Fails with [`Error::MissingManifest`] before anything else
/// is decoded when the table entry is absent.
pub(crate) fn read(bytes: &[u8]) -> Result<Contents> {
  let mut archive = ZipArchive::new(Cursor::new(bytes))?;

  let table = {
    let mut entry = match archive.by_name(MANIFEST_NAME) {
      Ok(entry) => entry,
      Err(ZipError::FileNotFound) => return Err(Error::MissingManifest),
      Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    String::from_utf8(buf)?
  };

  let mut images = BTreeMap::new();
  for i in 0..archive.len() {
    let mut entry = archive.by_index(i)?;
    if entry.is_dir() {
      continue;
    }
    let name = entry.name().to_owned();
    let Some((id, ext)) = parse_image_name(&name) else {
      if name != MANIFEST_NAME {
        debug!(%name, "ignoring unrecognised archive entry");
      }
      continue;
    };
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    images.insert(id, Photo::new(content_type_for(ext), buf));
  }

  Ok(Contents { table, images })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_names() {
    let png = Photo::new("image/png", vec![1u8, 2, 3]);
    assert_eq!(image_name(12, &png), "images/tree_12.png");
    assert_eq!(parse_image_name("images/tree_12.png"), Some((12, "png")));
    assert_eq!(parse_image_name("images/tree_7.photo.jpg"), None);
    assert_eq!(parse_image_name("images/tree_x.jpg"), None);
    assert_eq!(parse_image_name("images/tree_3"), None);
    assert_eq!(parse_image_name("other/tree_3.jpg"), None);
  }

  #[test]
  fn write_then_read() {
    let jpg = Photo::new("image/jpeg", vec![0xFF, 0xD8, 0xFF]);
    let odd = Photo::new("application/x-raw", vec![9u8; 64]);
    let bytes = write("table body", &[(2, jpg.clone()), (5, odd)]).unwrap();

    let contents = read(&bytes).unwrap();
    assert_eq!(contents.table, "table body");
    assert_eq!(contents.images.len(), 2);
    assert_eq!(contents.images[&2], jpg);
    assert_eq!(contents.images[&5].content_type, "application/octet-stream");
    assert_eq!(contents.images[&5].data.len(), 64);
  }

  #[test]
  fn missing_manifest_is_structural_error() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("images/tree_1.jpg", SimpleFileOptions::default()).unwrap();
    zip.write_all(&[1, 2, 3]).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    assert!(matches!(read(&bytes), Err(Error::MissingManifest)));
  }

  #[test]
  fn garbage_is_archive_error() {
    assert!(matches!(read(b"not a zip"), Err(Error::Archive(_))));
  }
}
