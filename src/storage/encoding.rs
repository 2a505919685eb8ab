//! Text encodings of INF files.
//!
//! INF files in the wild come as UTF-16 (with either byte order), UTF-8 with
//! or without a byte order mark, or a legacy code page. Reading tries a fixed
//! list of codecs and keeps the first that decodes the bytes without error.
//! Writing always produces UTF-16LE with a byte order mark, the encoding
//! Windows driver tooling expects.

use std::fmt;

/// Byte order mark written at the start of every output file.
pub const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Codecs tried when reading, in order.
pub const READ_ORDER: [Codec; 4] = [Codec::Utf16, Codec::Utf8Bom, Codec::Utf8, Codec::Gbk];

/// A text encoding an INF file may be read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// UTF-16 with a byte order mark, either endianness.
    Utf16,
    /// UTF-8 with a byte order mark.
    Utf8Bom,
    /// UTF-8 without a byte order mark.
    Utf8,
    /// The GBK code page.
    Gbk,
}

impl Codec {
    /// Strictly decodes `bytes`, returning `None` if they are not valid in
    /// this encoding.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf16 => decode_utf16(bytes),
            Self::Utf8Bom => {
                let body = bytes.strip_prefix(&UTF8_BOM)?;
                String::from_utf8(body.to_vec()).ok()
            }
            Self::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Self::Gbk => encoding_rs::GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(std::borrow::Cow::into_owned),
        }
    }

    /// The conventional name of the encoding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf16 => "utf-16",
            Self::Utf8Bom => "utf-8-sig",
            Self::Utf8 => "utf-8",
            Self::Gbk => "gbk",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decodes `bytes` with the first codec in `codecs` that accepts them.
#[must_use]
pub fn decode_with(bytes: &[u8], codecs: &[Codec]) -> Option<(Codec, String)> {
    codecs.iter().find_map(|&codec| {
        let text = codec.decode(bytes)?;
        tracing::trace!(%codec, "decoded INF text");
        Some((codec, text))
    })
}

/// Decodes `bytes` with the first codec of [`READ_ORDER`] that accepts them.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<(Codec, String)> {
    decode_with(bytes, &READ_ORDER)
}

/// Line terminator used when writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Write the text as it is held in memory.
    #[default]
    AsIs,
    /// Convert every `\n` to `\r\n`.
    Crlf,
}

/// Encodes text as UTF-16LE with a byte order mark.
#[must_use]
pub fn encode(text: &str, line_ending: LineEnding) -> Vec<u8> {
    let converted;
    let text = match line_ending {
        LineEnding::AsIs => text,
        LineEnding::Crlf => {
            converted = text.replace("\r\n", "\n").replace('\n', "\r\n");
            &converted
        }
    };

    let mut bytes = Vec::with_capacity(UTF16LE_BOM.len() + text.len() * 2);
    bytes.extend_from_slice(&UTF16LE_BOM);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, little_endian) = if let Some(body) = bytes.strip_prefix(&UTF16LE_BOM) {
        (body, true)
    } else if let Some(body) = bytes.strip_prefix(&UTF16BE_BOM) {
        (body, false)
    } else {
        return None;
    };

    if body.len() % 2 != 0 {
        return None;
    }

    let units = body.chunks_exact(2).map(|chunk| {
        if little_endian {
            u16::from_le_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], chunk[1]])
        }
    });
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "[Version]\nCatalogFile = igdlh.cat\n; Ω\n";

    fn utf16(text: &str, little_endian: bool) -> Vec<u8> {
        let (bom, units): (_, Vec<[u8; 2]>) = if little_endian {
            (UTF16LE_BOM, text.encode_utf16().map(u16::to_le_bytes).collect())
        } else {
            (UTF16BE_BOM, text.encode_utf16().map(u16::to_be_bytes).collect())
        };
        bom.into_iter().chain(units.into_iter().flatten()).collect()
    }

    #[test]
    fn utf16_with_either_bom_is_decoded_first() {
        assert_eq!(decode(&utf16(TEXT, true)), Some((Codec::Utf16, TEXT.to_string())));
        assert_eq!(decode(&utf16(TEXT, false)), Some((Codec::Utf16, TEXT.to_string())));
    }

    #[test]
    fn utf8_with_bom_drops_the_bom() {
        let bytes = [UTF8_BOM.as_slice(), TEXT.as_bytes()].concat();
        assert_eq!(decode(&bytes), Some((Codec::Utf8Bom, TEXT.to_string())));
    }

    #[test]
    fn plain_utf8_is_decoded() {
        assert_eq!(decode(TEXT.as_bytes()), Some((Codec::Utf8, TEXT.to_string())));
    }

    #[test]
    fn gbk_is_the_last_resort() {
        // "驱动" in GBK is not valid UTF-8.
        let bytes = b"; \xC7\xFD\xB6\xAF\n[Version]\n";
        assert_eq!(
            decode(bytes),
            Some((Codec::Gbk, "; 驱动\n[Version]\n".to_string()))
        );
    }

    #[test]
    fn undecodable_bytes_are_rejected() {
        // A lone GBK lead byte at the end of input is invalid everywhere.
        assert_eq!(decode(b"[Version]\n\x81"), None);
    }

    #[test]
    fn odd_length_utf16_is_rejected() {
        let mut bytes = utf16(TEXT, true);
        bytes.push(b'x');
        assert_eq!(Codec::Utf16.decode(&bytes), None);
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        let bytes = [0xFF, 0xFE, 0x00, 0xD8, 0x41, 0x00];
        assert_eq!(Codec::Utf16.decode(&bytes), None);
    }

    #[test]
    fn custom_codec_order_is_respected() {
        let bytes = TEXT.as_bytes();
        assert_eq!(
            decode_with(bytes, &[Codec::Gbk, Codec::Utf8]).map(|(codec, _)| codec),
            Some(Codec::Gbk)
        );
        assert_eq!(decode_with(bytes, &[Codec::Utf16]), None);
    }

    #[test]
    fn output_is_utf16le_with_bom() {
        let bytes = encode("[A]\n", LineEnding::AsIs);
        assert_eq!(bytes, [0xFF, 0xFE, b'[', 0, b'A', 0, b']', 0, b'\n', 0]);
    }

    #[test]
    fn encoded_text_decodes_to_the_same_text() {
        let bytes = encode(TEXT, LineEnding::AsIs);
        assert_eq!(decode(&bytes), Some((Codec::Utf16, TEXT.to_string())));
    }

    #[test]
    fn crlf_conversion_does_not_double_existing_crlf() {
        let bytes = encode("a\nb\r\nc", LineEnding::Crlf);
        assert_eq!(Codec::Utf16.decode(&bytes).unwrap(), "a\r\nb\r\nc");
    }
}
