//! Handshake and reconnect result codes
//!
//! Numeric `code` values carried in Hello and Reconnect payloads.

/// Result code of a Hello signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelloCode {
    /// Handshake accepted
    Success,
    /// A required connection parameter was missing (40100)
    MissingParameter,
    /// Token is malformed (40101)
    InvalidToken,
    /// Token failed verification (40102)
    TokenVerificationFailed,
    /// Token has expired (40103)
    TokenExpired,
    /// Any other code
    Unknown(i64),
}

impl HelloCode {
    /// Map a raw Hello code
    #[must_use]
    pub const fn from_i64(code: i64) -> Self {
        match code {
            0 => Self::Success,
            40100 => Self::MissingParameter,
            40101 => Self::InvalidToken,
            40102 => Self::TokenVerificationFailed,
            40103 => Self::TokenExpired,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw code
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Success => 0,
            Self::MissingParameter => 40100,
            Self::InvalidToken => 40101,
            Self::TokenVerificationFailed => 40102,
            Self::TokenExpired => 40103,
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the name of this code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::MissingParameter => "MissingParameter",
            Self::InvalidToken => "InvalidToken",
            Self::TokenVerificationFailed => "TokenVerificationFailed",
            Self::TokenExpired => "TokenExpired",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Get the description for this code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "handshake accepted",
            Self::MissingParameter => "missing parameter",
            Self::InvalidToken => "invalid token",
            Self::TokenVerificationFailed => "token verification failed",
            Self::TokenExpired => "token expired",
            Self::Unknown(_) => "unknown hello code",
        }
    }
}

impl std::fmt::Display for HelloCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_i64(), self.description())
    }
}

/// Result code of a Reconnect signal
///
/// Every code leads to the same outcome (a fresh connection); the code only
/// tells the logs why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconnectCode {
    /// Resume request lacked a parameter (40106)
    ResumeFailed,
    /// Session no longer exists on the server (40107)
    SessionExpired,
    /// The resumed `sn` was not accepted (40108)
    InvalidSn,
    /// Any other code
    Unknown(i64),
}

impl ReconnectCode {
    /// Map a raw Reconnect code
    #[must_use]
    pub const fn from_i64(code: i64) -> Self {
        match code {
            40106 => Self::ResumeFailed,
            40107 => Self::SessionExpired,
            40108 => Self::InvalidSn,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw code
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::ResumeFailed => 40106,
            Self::SessionExpired => 40107,
            Self::InvalidSn => 40108,
            Self::Unknown(code) => code,
        }
    }

    /// Get the name of this code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResumeFailed => "ResumeFailed",
            Self::SessionExpired => "SessionExpired",
            Self::InvalidSn => "InvalidSn",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Get the description for this code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ResumeFailed => "resume failed, missing parameter",
            Self::SessionExpired => "session expired",
            Self::InvalidSn => "invalid sn",
            Self::Unknown(_) => "unknown reconnect code",
        }
    }
}

impl std::fmt::Display for ReconnectCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_i64(), self.description())
    }
}
