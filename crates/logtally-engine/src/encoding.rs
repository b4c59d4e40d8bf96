use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use thiserror::Error;
use tracing::debug;

/// Error converting a file to UTF-8 before scanning
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("unsupported encoding label '{0}'")]
    UnsupportedLabel(String),

    #[error("failed to rewrite [{path}] as UTF-8")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether an encoding label from the configuration names a known encoding
pub fn is_supported_label(label: &str) -> bool {
    Encoding::for_label(label.as_bytes()).is_some()
}

/// Rewrite a file in place as UTF-8, decoding it from the given encoding
///
/// The scanner reads raw UTF-8 bytes, so non-UTF-8 logs are converted once
/// per pass before being opened. Undecodable sequences are replaced rather
/// than failing the whole file.
pub fn convert_to_utf8(path: &Path, label: &str) -> Result<(), EncodingError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::UnsupportedLabel(label.to_string()))?;

    if encoding == encoding_rs::UTF_8 {
        return Ok(());
    }

    debug!("converting {} from {label} to UTF-8", path.display());
    let io_err = |source| EncodingError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = fs::read(path).map_err(io_err)?;
    let (text, _, _) = encoding.decode(&bytes);
    fs::write(path, text.as_bytes()).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_labels() {
        assert!(is_supported_label("UTF-16LE"));
        assert!(is_supported_label("utf-8"));
        assert!(is_supported_label("windows-1252"));
        assert!(!is_supported_label("no-such-encoding"));
    }

    #[test]
    fn test_utf16le_file_is_rewritten_as_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utf16.log");

        let text = "DEBUG first\nINFO second\n";
        let mut bytes = Vec::new();
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&path, &bytes).unwrap();

        convert_to_utf8(&path, "UTF-16LE").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_utf8_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.log");
        fs::write(&path, "already utf-8\n").unwrap();

        convert_to_utf8(&path, "utf-8").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "already utf-8\n");
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.log");
        fs::write(&path, "x\n").unwrap();

        let err = convert_to_utf8(&path, "no-such-encoding").unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedLabel(_)));
    }
}
