//! Raw driver text loader
//!
//! Pasted text usually arrives as UTF-8, but spreadsheet and ERP exports on Windows are
//! often Windows-1252. Invalid UTF-8 is decoded as Windows-1252 instead of failing.

use std::io::Read;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

/// Decode raw bytes. Returns the text and whether the Windows-1252 fallback was used.
pub fn decode_raw_text(bytes: &[u8]) -> (String, bool) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => {
            let (decoded, _, had_errors) = WINDOWS_1252.decode(bytes);
            if had_errors {
                tracing::warn!("some characters could not be decoded from Windows-1252");
            }
            (decoded.into_owned(), true)
        }
    }
}

pub fn load_raw_text<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
    let bytes = std::fs::read(path.as_ref())?;
    let (text, fallback) = decode_raw_text(&bytes);
    if fallback {
        tracing::warn!(path = %path.as_ref().display(), "input is not UTF-8, decoded as Windows-1252");
    }
    Ok(text)
}

pub fn read_raw_text<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let (text, fallback) = decode_raw_text(&bytes);
    if fallback {
        tracing::warn!("input is not UTF-8, decoded as Windows-1252");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_utf8_passthrough() {
        let (text, fallback) = decode_raw_text("MOT: João".as_bytes());
        assert_eq!(text, "MOT: João");
        assert!(!fallback);
    }

    #[test]
    fn test_bom_is_stripped() {
        let (text, _) = decode_raw_text(b"\xEF\xBB\xBFAcme");
        assert_eq!(text, "Acme");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "MOT: João" in Windows-1252
        let (text, fallback) = decode_raw_text(b"MOT: Jo\xE3o");
        assert_eq!(text, "MOT: João");
        assert!(fallback);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Acme\nA\xE7o\n").unwrap();
        let text = load_raw_text(file.path()).unwrap();
        assert_eq!(text, "Acme\nAço\n");
    }

    #[test]
    fn test_read_from_reader() {
        let text = read_raw_text(&b"Beta\nGrain"[..]).unwrap();
        assert_eq!(text, "Beta\nGrain");
    }
}
