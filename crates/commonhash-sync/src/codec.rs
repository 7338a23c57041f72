//! Line-delimited framing for the manifest stream.
//!
//! ```text
//! MANIFEST <version> <algorithm> <count>\n
//! <128 hex chars>\n          (count times)
//! END <count>\n
//! ```
//!
//! Every frame ends with a newline, and the header and trailer both carry the
//! entry count, so the reader knows when the manifest is complete without
//! relying on connection close or read timeouts.

use bytes::{BufMut, BytesMut};
use commonhash_core::{Digest, DigestAlgorithm, DIGEST_HEX_LEN};
use tokio_util::codec::{Decoder, Encoder, LinesCodec};

use crate::error::CodecError;

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum accepted frame length, excluding the newline.
pub const MAX_LINE_LENGTH: usize = 256;

const HEADER_TAG: &str = "MANIFEST";
const TRAILER_TAG: &str = "END";

/// One frame of the manifest stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestFrame {
    /// Opens the stream.
    Header {
        version: u32,
        algorithm: DigestAlgorithm,
        count: u64,
    },
    /// One digest, in manifest order.
    Entry(Digest),
    /// Closes the stream; repeats the entry count.
    End { count: u64 },
}

impl ManifestFrame {
    /// Header for a manifest of `count` entries.
    pub fn header(algorithm: DigestAlgorithm, count: u64) -> Self {
        ManifestFrame::Header {
            version: PROTOCOL_VERSION,
            algorithm,
            count,
        }
    }

    /// Text form, without the trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            ManifestFrame::Header {
                version,
                algorithm,
                count,
            } => format!("{HEADER_TAG} {version} {algorithm} {count}"),
            ManifestFrame::Entry(digest) => digest.to_hex(),
            ManifestFrame::End { count } => format!("{TRAILER_TAG} {count}"),
        }
    }

    /// Parse one line (without its newline).
    pub fn parse(line: &str) -> Result<Self, CodecError> {
        if line.len() == DIGEST_HEX_LEN && line.bytes().all(|b| b.is_ascii_hexdigit()) {
            let digest = Digest::from_hex(line).map_err(|e| malformed(line, e))?;
            return Ok(ManifestFrame::Entry(digest));
        }

        let mut fields = line.split(' ');
        match fields.next() {
            Some(HEADER_TAG) => {
                let (Some(version), Some(algorithm), Some(count), None) =
                    (fields.next(), fields.next(), fields.next(), fields.next())
                else {
                    return Err(malformed(line, "header needs version, algorithm and count"));
                };
                Ok(ManifestFrame::Header {
                    version: version.parse().map_err(|e| malformed(line, e))?,
                    algorithm: algorithm.parse().map_err(|e| malformed(line, e))?,
                    count: count.parse().map_err(|e| malformed(line, e))?,
                })
            }
            Some(TRAILER_TAG) => {
                let (Some(count), None) = (fields.next(), fields.next()) else {
                    return Err(malformed(line, "trailer needs a count"));
                };
                Ok(ManifestFrame::End {
                    count: count.parse().map_err(|e| malformed(line, e))?,
                })
            }
            _ => Err(malformed(line, "unrecognized frame")),
        }
    }
}

fn malformed(line: &str, reason: impl std::fmt::Display) -> CodecError {
    let shown: String = line.chars().take(32).collect();
    CodecError::Malformed(format!("{reason} in {shown:?}"))
}

/// `tokio_util` codec for [`ManifestFrame`]s.
#[derive(Debug)]
pub struct ManifestCodec {
    lines: LinesCodec,
}

impl ManifestCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for ManifestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ManifestCodec {
    type Item = ManifestFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.lines.decode(src)? {
            Some(line) => ManifestFrame::parse(&line).map(Some),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::PartialFrame(src.len())),
        }
    }
}

impl Encoder<ManifestFrame> for ManifestCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: ManifestFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = frame.to_line();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(content: &[u8]) -> Digest {
        Digest::compute(DigestAlgorithm::Sha3_512, content)
    }

    #[test]
    fn test_header_line() {
        let frame = ManifestFrame::header(DigestAlgorithm::Sha3_512, 3);
        assert_eq!(frame.to_line(), "MANIFEST 1 sha3-512 3");
        assert_eq!(ManifestFrame::parse("MANIFEST 1 sha3-512 3").unwrap(), frame);
    }

    #[test]
    fn test_entry_line_is_bare_hex() {
        let d = digest(b"hello");
        let frame = ManifestFrame::Entry(d);
        assert_eq!(frame.to_line(), d.to_hex());
        assert_eq!(frame.to_line().len(), DIGEST_HEX_LEN);
        assert_eq!(ManifestFrame::parse(&d.to_hex()).unwrap(), frame);
    }

    #[test]
    fn test_trailer_line() {
        assert_eq!(ManifestFrame::End { count: 7 }.to_line(), "END 7");
        assert_eq!(
            ManifestFrame::parse("END 7").unwrap(),
            ManifestFrame::End { count: 7 }
        );
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            "",
            "HELLO",
            "MANIFEST 1 sha3-512",
            "MANIFEST 1 md5 3",
            "MANIFEST x sha3-512 3",
            "MANIFEST 1 sha3-512 3 extra",
            "END",
            "END -1",
            "abcd",
            &"g".repeat(DIGEST_HEX_LEN),
        ] {
            assert!(
                matches!(ManifestFrame::parse(line), Err(CodecError::Malformed(_))),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn test_decoder_handles_split_input() {
        let mut codec = ManifestCodec::new();
        let d = digest(b"split");

        let mut encoded = BytesMut::new();
        codec
            .encode(ManifestFrame::header(DigestAlgorithm::Sha3_512, 1), &mut encoded)
            .unwrap();
        codec.encode(ManifestFrame::Entry(d), &mut encoded).unwrap();
        codec.encode(ManifestFrame::End { count: 1 }, &mut encoded).unwrap();

        let mut frames = Vec::new();
        let mut buf = BytesMut::new();
        for chunk in encoded.chunks(5) {
            buf.extend_from_slice(chunk);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(
            frames,
            vec![
                ManifestFrame::header(DigestAlgorithm::Sha3_512, 1),
                ManifestFrame::Entry(d),
                ManifestFrame::End { count: 1 },
            ]
        );
    }

    #[test]
    fn test_decoder_rejects_long_line() {
        let mut codec = ManifestCodec::new();
        let mut buf = BytesMut::from("a".repeat(MAX_LINE_LENGTH + 10).as_str());
        assert!(matches!(codec.decode(&mut buf), Err(CodecError::LineTooLong)));
    }

    #[test]
    fn test_partial_frame_at_eof() {
        let mut codec = ManifestCodec::new();
        let mut buf = BytesMut::from(&digest(b"cut").to_hex()[..40]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CodecError::PartialFrame(40))
        ));
    }

    #[test]
    fn test_clean_eof() {
        let mut codec = ManifestCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
