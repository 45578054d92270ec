//! `fs` binding: file writing for scripts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::value::{DomObject, DomValue, expect_args, str_arg};

/// Encoding name selecting binary mode. Matched exactly.
pub const BASE64_ENCODING: &str = "BASE64";

/// Encoding used when none is given.
pub const DEFAULT_ENCODING: &str = "UTF-8";

#[derive(Debug, Error)]
pub enum FsError {
    #[error("Unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("Invalid BASE64 content: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write `content` to `path`, creating parent directories.
///
/// `"BASE64"` decodes `content` and writes the raw bytes. Any other encoding
/// writes `content` as text in that character set; characters it cannot
/// represent become `?`.
pub fn write_file(path: &Path, content: &str, encoding: &str) -> Result<(), FsError> {
    let bytes = if encoding == BASE64_ENCODING {
        STANDARD.decode(content)?
    } else {
        encode_text(content, encoding)?
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| FsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, &bytes).map_err(|source| FsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Encode text in a named character set.
pub fn encode_text(text: &str, encoding: &str) -> Result<Vec<u8>, FsError> {
    let normalized = encoding.trim().to_ascii_uppercase().replace('_', "-");
    let bytes = match normalized.as_str() {
        "UTF-8" | "UTF8" => text.as_bytes().to_vec(),
        // Big-endian with a byte order mark.
        "UTF-16" | "UTF16" => {
            let mut out = vec![0xFE, 0xFF];
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            out
        }
        "UTF-16BE" | "UTF16BE" => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        "UTF-16LE" | "UTF16LE" => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        "US-ASCII" | "ASCII" => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect(),
        "ISO-8859-1" | "ISO8859-1" | "LATIN1" => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
        _ => return Err(FsError::UnsupportedEncoding(encoding.to_string())),
    };
    Ok(bytes)
}

/// Script-facing file services.
#[derive(Debug, Default)]
pub struct FileSystemBinding;

impl FileSystemBinding {
    pub fn new() -> Self {
        Self
    }
}

impl DomObject for FileSystemBinding {
    fn type_name(&self) -> &str {
        "FileSystem"
    }

    fn methods(&self) -> &[&'static str] {
        &["write_file"]
    }

    fn call(&self, method: &str, args: &[DomValue]) -> Result<DomValue, String> {
        match method {
            "write_file" => {
                expect_args(method, args, 2, 3)?;
                let path = str_arg(method, args, 0)?;
                let content = str_arg(method, args, 1)?;
                let encoding = match args.get(2) {
                    Some(DomValue::Unit) | None => DEFAULT_ENCODING,
                    Some(_) => str_arg(method, args, 2)?,
                };
                write_file(Path::new(path), content, encoding).map_err(|e| e.to_string())?;
                Ok(DomValue::Unit)
            }
            _ => Err(format!("FileSystem has no method '{method}'")),
        }
    }
}
