/// Text encoding applied by the message operations of [`crate::BleSerial`].
///
/// There is no delimiter or length framing; a message is exactly the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum TextEncoding {
    /// 7-bit ASCII, one byte per character. Characters and bytes outside the range become `?`.
    #[default]
    Ascii,
    /// ISO-8859-1, one byte per character. Characters above U+00FF become `?`.
    Latin1,
    /// UTF-8. Invalid received sequences are replaced with U+FFFD.
    Utf8,
}

const REPLACEMENT: u8 = b'?';

impl TextEncoding {
    /// Encodes `text` for transmission; never fails.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                .collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                .collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
        }
    }

    /// Decodes a received value; never fails.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { REPLACEMENT as char })
                .collect(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}
