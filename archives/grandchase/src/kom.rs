#[cfg(feature = "import")]
use gck_core::io_ext::ReadBinExt;

#[cfg(feature = "export")]
use gck_core::io_ext::WriteBinExt;

use byteorder::LE;

#[cfg(feature = "import")]
use byteorder::ReadBytesExt;

#[cfg(feature = "export")]
use byteorder::WriteBytesExt;

#[cfg(feature = "import")]
use flate2::read::ZlibDecoder;

#[cfg(feature = "export")]
use flate2::{
	write::ZlibEncoder,
	Compression
};

#[cfg(feature = "import")]
use std::io::Read;

#[cfg(feature = "export")]
use std::io::Write;

#[cfg(feature = "import")]
use import::KOMImportError;

#[cfg(feature = "export")]
use export::KOMExportError;

pub static MAGIC: &str = "KOG GC TEAM MASSFILE V.0.2";

/// Width of the tag field, and of the padding that follows it
pub const TAG_LEN: usize = 26;

/// Width of an entry's null-padded name field
pub const NAME_LEN: usize = 60;

/// One packed file, held uncompressed in memory
#[derive(Clone, Debug, PartialEq)]
pub struct KomEntry {
	pub name: String,
	pub data: Vec<u8>,
}

/// A KOM massfile: a flat directory of zlib-compressed blobs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KomArchive {
	pub entries: Vec<KomEntry>,
}

impl KomArchive {
	pub fn new(entries: Vec<KomEntry>) -> KomArchive {
		KomArchive {
			entries: entries,
		}
	}

	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<KomArchive, KOMImportError>
	where
		R: ReadBytesExt,
	{
		let tag = buf.read_str_fixed(TAG_LEN)?;
		if tag != MAGIC {
			return Err(KOMImportError::Magic(tag));
		}

		let mut pad = [0; TAG_LEN];
		buf.read_exact(&mut pad)?;

		let count = buf.read_u32::<LE>()?;
		let _reserved = buf.read_u32::<LE>()?;

		// the count is untrusted until the directory actually reads, so
		// no preallocation from it
		let mut dir = vec![];
		for _ in 0..count {
			let name = buf.read_str_fixed(NAME_LEN)?;
			let uncompressed = buf.read_u32::<LE>()?;
			let compressed = buf.read_u32::<LE>()?;
			let offset = buf.read_u32::<LE>()?;

			dir.push((name, uncompressed, compressed, offset));
		}

		// offsets are relative to the start of the blob region
		let mut blob = vec![];
		buf.read_to_end(&mut blob)?;

		let mut entries = Vec::with_capacity(dir.len());
		for (name, uncompressed, compressed, offset) in dir {
			let start = offset as usize;
			let end = start + compressed as usize;

			if end > blob.len() {
				return Err(KOMImportError::Blob {
					name: name,
					offset: offset,
					size: compressed,
				});
			}

			let mut data = vec![];
			let mut dec = ZlibDecoder::new(&blob[start..end]);
			dec.read_to_end(&mut data)?;

			if data.len() != uncompressed as usize {
				return Err(KOMImportError::Size {
					name: name,
					expected: uncompressed,
					actual: data.len(),
				});
			}

			entries.push(KomEntry {
				name: name,
				data: data,
			});
		}

		Ok(KomArchive {
			entries: entries,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), KOMExportError>
	where
		W: WriteBytesExt,
	{
		// sizes go in the directory, so compress everything up front
		let mut blobs = Vec::with_capacity(self.entries.len());
		for entry in self.entries.iter() {
			if entry.name.len() > NAME_LEN {
				return Err(KOMExportError::Name(entry.name.clone()));
			}

			let mut enc = ZlibEncoder::new(vec![], Compression::default());
			enc.write_all(entry.data.as_slice())?;
			blobs.push(enc.finish()?);
		}

		buf.write_str_fixed(MAGIC, TAG_LEN)?;
		buf.write_zeros(TAG_LEN)?;
		buf.write_u32::<LE>(self.entries.len() as u32)?;
		buf.write_u32::<LE>(1)?;

		let mut offset = 0u32;
		for (entry, blob) in self.entries.iter().zip(blobs.iter()) {
			buf.write_str_fixed(entry.name.as_str(), NAME_LEN)?;
			buf.write_u32::<LE>(entry.data.len() as u32)?;
			buf.write_u32::<LE>(blob.len() as u32)?;
			buf.write_u32::<LE>(offset)?;

			offset += blob.len() as u32;
		}

		for blob in blobs.iter() {
			buf.write_all(blob.as_slice())?;
		}

		Ok(())
	}
}

#[cfg(feature = "import")]
pub mod import {
	use std::io;
	use thiserror::Error;

	#[derive(Debug, Error)]
	pub enum KOMImportError {
		#[error("Entry {name:?} points past the blob region: offset {offset}, size {size}")]
		Blob {
			name: String,
			offset: u32,
			size: u32,
		},
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Not a KOM massfile: {0:?}")]
		Magic(String),
		#[error("Entry {name:?} inflated to {actual} bytes, directory says {expected}")]
		Size {
			name: String,
			expected: u32,
			actual: usize,
		},
	}
}

#[cfg(feature = "export")]
pub mod export {
	use std::io;
	use thiserror::Error;

	#[derive(Debug, Error)]
	pub enum KOMExportError {
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Entry name is wider than its field: {0:?}")]
		Name(String),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(all(feature = "import", feature = "export"))]
	#[test]
	fn test_round_trip() {
		let archive = KomArchive::new(vec![
			KomEntry {
				name: "hero.p3m".to_string(),
				data: vec![0x50; 1000],
			},
			KomEntry {
				name: "crc.xml".to_string(),
				data: b"<crc/>".to_vec(),
			},
		]);

		let mut data = vec![];
		archive.write(&mut data).unwrap();

		let out = KomArchive::read(&mut data.as_slice()).unwrap();
		assert_eq!(out, archive);
	}

	#[cfg(feature = "import")]
	#[test]
	fn test_rejects_magic() {
		let data = vec![0x41; 128];

		match KomArchive::read(&mut data.as_slice()) {
			Err(import::KOMImportError::Magic(_)) => {},
			other => panic!("expected magic rejection, got {:?}", other),
		}
	}

	#[cfg(all(feature = "import", feature = "export"))]
	#[test]
	fn test_rejects_blob_overrun() {
		let archive = KomArchive::new(vec![KomEntry {
			name: "a.p3m".to_string(),
			data: vec![1, 2, 3],
		}]);

		let mut data = vec![];
		archive.write(&mut data).unwrap();

		// chop the blob region short
		data.truncate(data.len() - 1);

		match KomArchive::read(&mut data.as_slice()) {
			Err(import::KOMImportError::Blob { .. }) => {},
			other => panic!("expected blob rejection, got {:?}", other),
		}
	}

	#[cfg(feature = "import")]
	#[test]
	fn test_rejects_huge_entry_count() {
		// a directory count nothing backs must error, not exhaust memory
		let mut data = vec![];
		data.extend_from_slice(MAGIC.as_bytes());
		data.extend_from_slice(&[0; TAG_LEN]);
		data.extend_from_slice(&u32::MAX.to_le_bytes());
		data.extend_from_slice(&1u32.to_le_bytes());

		match KomArchive::read(&mut data.as_slice()) {
			Err(import::KOMImportError::IO { .. }) => {},
			other => panic!("expected truncation error, got {:?}", other),
		}
	}

	#[cfg(feature = "export")]
	#[test]
	fn test_rejects_wide_name() {
		let archive = KomArchive::new(vec![KomEntry {
			name: "x".repeat(NAME_LEN + 1),
			data: vec![],
		}]);

		let mut data: Vec<u8> = vec![];
		match archive.write(&mut data) {
			Err(export::KOMExportError::Name(_)) => {},
			other => panic!("expected name rejection, got {:?}", other),
		}
	}
}
