//! Documents: one file's path, decoded text, and detected encoding.

use std::path::{Path, PathBuf};

use crate::error::FileError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How the text was stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// UTF-8 with a byte order mark, re-emitted on write.
    Utf8Bom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    pub encoding: Encoding,
}

impl Document {
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// Read and decode a file. Anything but UTF-8 is unreadable.
    pub fn read(path: &Path) -> Result<Self, FileError> {
        let bytes = std::fs::read(path).map_err(|e| FileError::unreadable(path, e))?;
        let (encoding, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (Encoding::Utf8Bom, rest.to_vec()),
            None => (Encoding::Utf8, bytes),
        };
        let text = String::from_utf8(body)
            .map_err(|e| FileError::unreadable(path, format!("not valid UTF-8: {}", e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
            encoding,
        })
    }

    /// Encode `text` the way this document was stored.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if self.encoding == Encoding::Utf8Bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(text.as_bytes());
        out
    }
}
