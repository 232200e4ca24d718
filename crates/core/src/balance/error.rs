//! Error types for balance operations.

use rust_decimal::Decimal;
use thiserror::Error;

use divvy_shared::types::{GroupId, UserId};

/// The backing fact store failed a read or write.
///
/// Propagated to the caller unmodified; the core performs no retry and no
/// silent fallback. A failed fetch fails the whole balance query rather
/// than returning a misleading zero-balance result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Fact store error: {0}")]
pub struct StoreError(pub String);

/// Errors that can occur during balance operations.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Settlement amount must be positive.
    #[error("Settlement amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A user cannot settle with themselves.
    #[error("Cannot record a settlement to yourself")]
    SelfSettlement,

    /// The user is not a member of the group.
    #[error("User {user_id} is not a member of group {group_id}")]
    NotGroupMember {
        /// The user that failed the membership check.
        user_id: UserId,
        /// The group the operation targeted.
        group_id: GroupId,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BalanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::SelfSettlement => "SELF_SETTLEMENT",
            Self::NotGroupMember { .. } => "NOT_GROUP_MEMBER",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NonPositiveAmount(_) | Self::SelfSettlement => 400,
            Self::NotGroupMember { .. } => 403,
            Self::Store(_) => 500,
        }
    }
}
