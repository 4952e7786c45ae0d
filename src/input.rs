//! Reading SQL Server scripts from disk.
//!
//! SSMS exports are commonly UTF-16 with a BOM, or a legacy single-byte code
//! page. The file is decompressed based on its extension, then decoded:
//! a byte-order mark wins, then strict UTF-8, then windows-1251.

use anyhow::Context;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Decoded script text and the name of the encoding it was read with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSource {
    pub text: String,
    pub encoding: &'static str,
}

/// Read, decompress and decode a script file.
pub fn read_sql_file(path: &Path) -> anyhow::Result<SqlSource> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file {}", path.display()))?;

    let compression = Compression::from_path(path);
    if compression != Compression::None {
        tracing::debug!(%compression, "decompressing input");
    }

    let mut reader = compression
        .wrap_reader(Box::new(file))
        .with_context(|| format!("Failed to open {} stream for {}", compression, path.display()))?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    Ok(decode(&bytes))
}

/// Decode raw bytes: BOM, then UTF-8, then windows-1251.
///
/// windows-1251 maps every byte, so decoding never fails.
pub fn decode(bytes: &[u8]) -> SqlSource {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return SqlSource {
            text: text.into_owned(),
            encoding: encoding.name(),
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => SqlSource {
            text: text.to_string(),
            encoding: UTF_8.name(),
        },
        Err(_) => {
            tracing::debug!("input is not valid UTF-8, falling back to windows-1251");
            let (text, _) = WINDOWS_1251.decode_without_bom_handling(bytes);
            SqlSource {
                text: text.into_owned(),
                encoding: WINDOWS_1251.name(),
            }
        }
    }
}
