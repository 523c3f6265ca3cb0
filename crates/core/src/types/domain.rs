//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain a dot.
    #[error("shop domain must contain at least one dot")]
    MissingDot,
    /// The input contains a character outside `[a-z0-9.-]`.
    #[error("shop domain contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// The input starts or ends with a separator.
    #[error("shop domain cannot start or end with '.' or '-'")]
    BadBoundary,
}

/// A store's domain as registered on the remote platform
/// (e.g., `acme-surf.myshopify.com`).
///
/// The domain is the tenant's globally unique key: webhook deliveries carry
/// it as their only tenant discriminator, so it is validated on the way in
/// and normalized to lowercase.
///
/// ## Constraints
///
/// - Length: 1-253 characters (DNS limit)
/// - Must contain at least one dot
/// - Only `[a-z0-9.-]` after lowercasing; no scheme, path, or port
/// - Must not start or end with `.` or `-`
///
/// ## Examples
///
/// ```
/// use tidesync_core::ShopDomain;
///
/// // Valid domains
/// assert!(ShopDomain::parse("acme-surf.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("SHOP.example.io").is_ok()); // lowercased
///
/// // Invalid domains
/// assert!(ShopDomain::parse("").is_err());            // empty
/// assert!(ShopDomain::parse("no-dot").is_err());      // missing dot
/// assert!(ShopDomain::parse("https://a.com").is_err()); // scheme
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a domain name (DNS limit).
    pub const MAX_LENGTH: usize = 253;

    /// Parse a `ShopDomain` from a string, normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Is longer than 253 characters
    /// - Does not contain a dot
    /// - Contains characters outside `[a-z0-9.-]`
    /// - Starts or ends with `.` or `-`
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let normalized = s.to_ascii_lowercase();

        if !normalized.contains('.') {
            return Err(ShopDomainError::MissingDot);
        }

        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        if normalized.starts_with(['.', '-']) || normalized.ends_with(['.', '-']) {
            return Err(ShopDomainError::BadBoundary);
        }

        Ok(Self(normalized))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the first label of the domain (before the first dot).
    ///
    /// Used as the default display name at tenant registration
    /// (e.g., `acme-surf` for `acme-surf.myshopify.com`).
    #[must_use]
    pub fn first_label(&self) -> &str {
        self.0.split('.').next().unwrap_or("")
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
