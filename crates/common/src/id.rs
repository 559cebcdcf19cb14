//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// Length of a referral code.
pub const REFERRAL_CODE_LEN: usize = 8;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs sort by creation time, which keeps ledger and report rows in
    /// insertion order when listed by primary key.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque bearer token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // No time component in tokens
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a shareable referral code.
    ///
    /// Codes are upper-case Crockford base32 taken from the random half of a
    /// ULID, so they never contain `I`, `L`, `O` or `U`.
    #[must_use]
    pub fn generate_referral_code(&self) -> String {
        let ulid = Ulid::new().to_string();
        ulid[ulid.len() - REFERRAL_CODE_LEN..].to_string()
    }
}

/// Normalize a user-entered referral code for lookup.
#[must_use]
pub fn normalize_referral_code(code: &str) -> String {
    code.trim().to_uppercase()
}
