use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Byte length of a raw content identifier (a blake3 digest).
pub const CID_LEN: usize = 32;

/// Content identifier: the blake3 hash of a byte sequence.
///
/// The string form is 64 lowercase hex characters. Identical bytes always
/// produce the same `Cid`, which is what makes resources, containers, and
/// published records content-addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid([u8; CID_LEN]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCidError {
    #[error("expected {expected} hex characters, got {got}")]
    BadLength { expected: usize, got: usize },
    #[error("invalid hex character '{0}'")]
    BadCharacter(char),
}

impl Cid {
    /// Compute the content identifier of a byte buffer.
    pub fn compute(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; CID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a `Cid` from a raw byte slice, as read out of a container block.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseCidError> {
        let arr: [u8; CID_LEN] = bytes.try_into().map_err(|_| ParseCidError::BadLength {
            expected: CID_LEN * 2,
            got: bytes.len() * 2,
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; CID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Cid {
    type Err = ParseCidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CID_LEN * 2 {
            return Err(ParseCidError::BadLength {
                expected: CID_LEN * 2,
                got: s.len(),
            });
        }
        let mut out = [0u8; CID_LEN];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let hi = hex_nibble(chunk[0])?;
            let lo = hex_nibble(chunk[1])?;
            out[i] = (hi << 4) | lo;
        }
        Ok(Self(out))
    }
}

fn hex_nibble(c: u8) -> Result<u8, ParseCidError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(ParseCidError::BadCharacter(char::from(c))),
    }
}

impl TryFrom<String> for Cid {
    type Error = ParseCidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.to_string()
    }
}
