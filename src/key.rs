// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Pathname keys, labels, and the hash that ties them together.

use blake3::Hasher;
use serde::Deserialize;
use serde::Serialize;

/// Wire spelling of the negative-infinity sentinel.
pub const NEG_INF: &str = "-INF";

/// Wire spelling of the positive-infinity sentinel.
pub const POS_INF: &str = "+INF";

/// A totally ordered pathname, bounded by two sentinels.
///
/// Variant order gives `NegInf < Path(_) < PosInf`, and paths compare
/// lexicographically by their UTF-8 bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    NegInf,
    Path(String),
    PosInf,
}

/// A node label: a hash, or raw bytes for terminal leaves.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub Vec<u8>);

/// The label of the root node, authenticating the whole mapping.
pub type Basis = Label;

/// Hash an ordered list of byte strings as their concatenation.
pub fn hash(parts: &[&[u8]]) -> Label {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    return Label(hasher.finalize().as_bytes().to_vec());
}

impl Key {
    /// Parse a wire pathname, mapping the sentinel spellings to sentinels.
    pub fn parse(pathname: &str) -> Key {
        return match pathname {
            NEG_INF => Key::NegInf,
            POS_INF => Key::PosInf,
            other => Key::Path(other.to_string()),
        };
    }

    pub fn path(pathname: &str) -> Key {
        return Key::Path(pathname.to_string());
    }

    pub fn is_sentinel(&self) -> bool {
        return !matches!(self, Key::Path(_));
    }

    /// The bytes hashed into labels for this key.
    pub fn encode(&self) -> &[u8] {
        return match self {
            Key::NegInf => NEG_INF.as_bytes(),
            Key::Path(path) => path.as_bytes(),
            Key::PosInf => POS_INF.as_bytes(),
        };
    }

    /// Content hash stored in sentinel leaves.
    pub fn sentinel_filehash(&self) -> Vec<u8> {
        return hash(&[self.encode()]).0;
    }
}

impl Label {
    pub fn as_bytes(&self) -> &[u8] {
        return &self.0;
    }

    pub fn to_hex(&self) -> String {
        return hex(&self.0);
    }
}

pub fn hex(bytes: &[u8]) -> String {
    return bytes.iter().map(|b| format!("{:02x}", b)).collect();
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Key::NegInf => write!(f, "{}", NEG_INF),
            Key::Path(path) => write!(f, "{:?}", path),
            Key::PosInf => write!(f, "{}", POS_INF),
        };
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", String::from_utf8_lossy(self.encode()));
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Label({})", hex(&self.0));
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", self.to_hex());
    }
}
