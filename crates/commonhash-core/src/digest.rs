//! Content digests.
//!
//! A [`Hasher`] is the write-only accumulator fed with file blocks; it is
//! consumed by [`Hasher::finalize`] to produce a [`Digest`]. Only digests are
//! compared or serialized.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::Digest as _;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseDigestError;

/// Length of a digest in bytes (512 bits).
pub const DIGEST_LEN: usize = 64;

/// Length of a digest in lowercase hex text.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// The hash function used to build a manifest.
///
/// Both algorithms produce 512-bit values so the wire encoding is the same
/// width regardless of the choice. Peers must agree on the algorithm for a
/// comparison to mean anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA3-512.
    #[default]
    #[serde(rename = "sha3-512")]
    Sha3_512,
    /// BLAKE3 in extended-output mode, truncated to 512 bits.
    #[serde(rename = "blake3-512")]
    Blake3_512,
}

impl DigestAlgorithm {
    /// Stable text name, as used on the wire and on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha3_512 => "sha3-512",
            DigestAlgorithm::Blake3_512 => "blake3-512",
        }
    }

    /// Start a new accumulator for this algorithm.
    pub fn hasher(&self) -> Hasher {
        Hasher::new(*self)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha3-512" => Ok(DigestAlgorithm::Sha3_512),
            "blake3-512" => Ok(DigestAlgorithm::Blake3_512),
            other => Err(ParseDigestError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// An immutable 512-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// Digest a complete in-memory buffer.
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Convert to lowercase hex (always [`DIGEST_HEX_LEN`] characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex. Upper and lower case are both accepted.
    pub fn from_hex(s: &str) -> Result<Self, ParseDigestError> {
        let mut arr = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Streaming digest accumulator.
///
/// Feed it with [`update`](Hasher::update) in blocks of any size, then call
/// [`finalize`](Hasher::finalize) once.
pub struct Hasher {
    algorithm: DigestAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha3(sha3::Sha3_512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    /// Create an empty accumulator.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha3_512 => HasherState::Sha3(sha3::Sha3_512::new()),
            DigestAlgorithm::Blake3_512 => HasherState::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self { algorithm, state }
    }

    /// The algorithm this accumulator computes.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Absorb another block of input.
    pub fn update(&mut self, block: &[u8]) {
        match &mut self.state {
            HasherState::Sha3(h) => h.update(block),
            HasherState::Blake3(h) => {
                h.update(block);
            }
        }
    }

    /// Consume the accumulator and produce the digest.
    pub fn finalize(self) -> Digest {
        let mut out = [0u8; DIGEST_LEN];
        match self.state {
            HasherState::Sha3(h) => out.copy_from_slice(&h.finalize()),
            HasherState::Blake3(h) => h.finalize_xof().fill(&mut out),
        }
        Digest(out)
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hasher({})", self.algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA3_512_EMPTY: &str = "a69f73cca23a9ac5c8b567dc185a756e97c982164fe25859e0d1dcc1475c80a6\
                                  15b2123af1f5f94c11e3e9402c3ac558f500199d95b6d3e301758586281dcd26";

    const SHA3_512_ABC: &str = "b751850b1a57168a5693cd924b6b096e08f621827444f70d884f5d0240d2712e\
                                10e116e9192af3c91a7ec57647e3934057340b4cf408d5a56592f8274eec53f0";

    #[test]
    fn test_sha3_512_known_vectors() {
        assert_eq!(
            Digest::compute(DigestAlgorithm::Sha3_512, b"").to_hex(),
            SHA3_512_EMPTY
        );
        assert_eq!(
            Digest::compute(DigestAlgorithm::Sha3_512, b"abc").to_hex(),
            SHA3_512_ABC
        );
    }

    #[test]
    fn test_blake3_prefix_matches_standard_hash() {
        let digest = Digest::compute(DigestAlgorithm::Blake3_512, b"hello");
        assert_eq!(&digest.0[..32], blake3::hash(b"hello").as_bytes());
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        for algorithm in [DigestAlgorithm::Sha3_512, DigestAlgorithm::Blake3_512] {
            let data = b"the quick brown fox jumps over the lazy dog";
            let mut hasher = algorithm.hasher();
            for chunk in data.chunks(7) {
                hasher.update(chunk);
            }
            assert_eq!(hasher.finalize(), Digest::compute(algorithm, data));
        }
    }

    #[test]
    fn test_algorithms_differ() {
        assert_ne!(
            Digest::compute(DigestAlgorithm::Sha3_512, b"x"),
            Digest::compute(DigestAlgorithm::Blake3_512, b"x")
        );
    }

    #[test]
    fn test_hex_roundtrip_and_width() {
        let digest = Digest::compute(DigestAlgorithm::Sha3_512, b"hello");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), DIGEST_HEX_LEN);
        assert_eq!(Digest::from_hex(&hex).unwrap(), digest);
        assert_eq!(Digest::from_hex(&hex.to_uppercase()).unwrap(), digest);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert_eq!(
            Digest::from_hex("abcd"),
            Err(ParseDigestError::Hex(hex::FromHexError::InvalidStringLength))
        );
        assert_eq!(
            Digest::from_hex(&"z".repeat(DIGEST_HEX_LEN)),
            Err(ParseDigestError::Hex(hex::FromHexError::InvalidHexCharacter {
                c: 'z',
                index: 0
            }))
        );
    }

    #[test]
    fn test_algorithm_names() {
        for algorithm in [DigestAlgorithm::Sha3_512, DigestAlgorithm::Blake3_512] {
            assert_eq!(algorithm.as_str().parse::<DigestAlgorithm>(), Ok(algorithm));
        }
        assert_eq!(
            "md5".parse::<DigestAlgorithm>(),
            Err(ParseDigestError::UnknownAlgorithm("md5".into()))
        );
    }

    #[test]
    fn test_digest_serializes_as_hex() {
        let digest = Digest::from_bytes([0xab; DIGEST_LEN]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(DIGEST_LEN)));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn test_display_is_short() {
        let digest = Digest::from_bytes([0xcd; DIGEST_LEN]);
        assert_eq!(format!("{}", digest), "cdcdcdcdcdcdcdcd");
        assert!(format!("{:?}", digest).starts_with("Digest("));
    }
}
