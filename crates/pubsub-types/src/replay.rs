//! Replay tokens and subscription start positions.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TypesError};

/// Opaque resumption token returned by the server.
///
/// The bytes are stored and returned exactly as received. Any rendering for
/// humans goes through [`ReplayToken::display_hint`], which works on a copy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ReplayToken(Vec<u8>);

impl ReplayToken {
    /// Create a token from raw bytes. Empty tokens are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypesError::EmptyReplayToken);
        }
        Ok(Self(bytes))
    }

    /// Token bytes, untouched.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 form used on the command line and in persisted files.
    pub fn to_cli_string(&self) -> String {
        general_purpose::STANDARD.encode(&self.0)
    }

    /// Parse the base64 form produced by [`ReplayToken::to_cli_string`].
    pub fn from_cli_string(s: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| TypesError::InvalidTokenEncoding(e.to_string()))?;
        Self::new(bytes)
    }

    /// Human-readable rendering for logs.
    ///
    /// Tokens of at most eight bytes are shown as a big-endian unsigned
    /// integer, which is how replay ids are usually quoted by operators.
    /// Longer tokens fall back to base64.
    pub fn display_hint(&self) -> String {
        if self.0.len() <= 8 {
            let mut buf = [0u8; 8];
            buf[8 - self.0.len()..].copy_from_slice(&self.0);
            u64::from_be_bytes(buf).to_string()
        } else {
            self.to_cli_string()
        }
    }
}

impl std::fmt::Debug for ReplayToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplayToken({})", self.display_hint())
    }
}

impl std::fmt::Display for ReplayToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_hint())
    }
}

impl Serialize for ReplayToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_cli_string())
    }
}

impl<'de> Deserialize<'de> for ReplayToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ReplayToken::from_cli_string(&s).map_err(serde::de::Error::custom)
    }
}

/// Where a new subscription starts reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayPosition {
    /// Start of the retention window.
    Earliest,
    /// Only events published after the subscription is established.
    ///
    /// Never used by the batch collector: a process that subscribes, fetches
    /// and exits would permanently skip everything published between runs.
    Latest,
    /// Resume after a token previously returned by the server.
    Custom(ReplayToken),
}

impl ReplayPosition {
    /// Resume from a stored cursor if there is one, otherwise from the
    /// beginning of the retention window.
    pub fn resume_or_earliest(cursor: Option<ReplayToken>) -> Self {
        match cursor {
            Some(token) => ReplayPosition::Custom(token),
            None => ReplayPosition::Earliest,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ReplayPosition::Custom(_))
    }

    pub fn token(&self) -> Option<&ReplayToken> {
        match self {
            ReplayPosition::Custom(token) => Some(token),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReplayPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayPosition::Earliest => write!(f, "EARLIEST"),
            ReplayPosition::Latest => write!(f, "LATEST"),
            ReplayPosition::Custom(token) => write!(f, "CUSTOM({token})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            ReplayToken::new(Vec::new()),
            Err(TypesError::EmptyReplayToken)
        ));
    }

    #[test]
    fn test_cli_string_roundtrip() {
        let token = ReplayToken::new(vec![0, 0, 0, 0, 0, 1, 0xe2, 0x40, 0xff, 0x00]).unwrap();
        let parsed = ReplayToken::from_cli_string(&token.to_cli_string()).unwrap();
        assert_eq!(parsed.as_bytes(), token.as_bytes());
    }

    #[test]
    fn test_invalid_cli_string() {
        let result = ReplayToken::from_cli_string("not base64!!");
        assert!(matches!(result, Err(TypesError::InvalidTokenEncoding(_))));
    }

    #[test]
    fn test_display_hint_short_token_is_integer() {
        let token = ReplayToken::new(vec![0x00, 0x01, 0xe2, 0x40]).unwrap();
        assert_eq!(token.display_hint(), "123456");
        // the hint is computed on a copy
        assert_eq!(token.as_bytes(), &[0x00, 0x01, 0xe2, 0x40]);
    }

    #[test]
    fn test_display_hint_long_token_is_base64() {
        let bytes: Vec<u8> = (0u8..12).collect();
        let token = ReplayToken::new(bytes).unwrap();
        assert_eq!(token.display_hint(), token.to_cli_string());
    }

    #[test]
    fn test_serde_uses_base64() {
        let token = ReplayToken::new(b"tok1".to_vec()).unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"dG9rMQ==\"");
        let back: ReplayToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_resume_or_earliest() {
        assert_eq!(
            ReplayPosition::resume_or_earliest(None),
            ReplayPosition::Earliest
        );
        let token = ReplayToken::new(b"tok1".to_vec()).unwrap();
        let position = ReplayPosition::resume_or_earliest(Some(token.clone()));
        assert!(position.is_custom());
        assert_eq!(position.token(), Some(&token));
    }
}
