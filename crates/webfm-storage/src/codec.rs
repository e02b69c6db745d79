//! Best-effort text encoding detection.
//!
//! Editable files arrive in whatever encoding the user's tools produced.
//! Everything is normalized to UTF-8 before it reaches the client.

/// Detected source encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// UTF-8 without a byte order mark.
    Utf8,
    /// UTF-8 with a byte order mark.
    Utf8Bom,
    /// UTF-16 little endian with a byte order mark.
    Utf16Le,
    /// UTF-16 big endian with a byte order mark.
    Utf16Be,
    /// Anything else, read as Windows-1252.
    Windows1252,
}

/// Decode raw file bytes into a UTF-8 string.
pub fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return (String::from_utf8_lossy(rest).into_owned(), TextEncoding::Utf8Bom);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return (decode_utf16(rest, u16::from_le_bytes), TextEncoding::Utf16Le);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return (decode_utf16(rest, u16::from_be_bytes), TextEncoding::Utf16Be);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| windows_1252(b)).collect(),
            TextEncoding::Windows1252,
        ),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn windows_1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž',
        '\u{8F}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ',
        '\u{9D}', 'ž', 'Ÿ',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        other => other as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        let (text, enc) = decode("grüße".as_bytes());
        assert_eq!(text, "grüße");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let (text, enc) = decode(b"\xEF\xBB\xBFhello");
        assert_eq!(text, "hello");
        assert_eq!(enc, TextEncoding::Utf8Bom);
    }

    #[test]
    fn test_utf16_le_and_be() {
        let (text, enc) = decode(&[0xFF, 0xFE, b'h', 0, b'i', 0]);
        assert_eq!(text, "hi");
        assert_eq!(enc, TextEncoding::Utf16Le);

        let (text, enc) = decode(&[0xFE, 0xFF, 0, b'h', 0, b'i']);
        assert_eq!(text, "hi");
        assert_eq!(enc, TextEncoding::Utf16Be);
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_windows_1252() {
        let (text, enc) = decode(b"caf\xE9 \x80");
        assert_eq!(text, "café €");
        assert_eq!(enc, TextEncoding::Windows1252);
    }
}
