/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a stored or submitted value does not name a known variant
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Account roles. HR accounts own assets and employees; employees request assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hr,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hr => "hr",
            Role::Employee => "employee",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hr" => Ok(Role::Hr),
            "employee" => Ok(Role::Employee),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

/// Request lifecycle: pending -> approved | rejected, exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(UnknownVariant { kind: "request status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    Returnable,
    NonReturnable,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Returnable => "returnable",
            AssetType::NonReturnable => "non-returnable",
        }
    }
}

impl FromStr for AssetType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "returnable" => Ok(AssetType::Returnable),
            "non-returnable" => Ok(AssetType::NonReturnable),
            other => Err(UnknownVariant { kind: "asset type", value: other.to_string() }),
        }
    }
}

/// How the employee quota is compared against the pre-increment count.
///
/// `Permissive` rejects only once the count is already above the limit, so an
/// account can reach `limit + 1`. `Strict` rejects as soon as the count has
/// reached the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPolicy {
    #[default]
    Permissive,
    Strict,
}

impl QuotaPolicy {
    /// Whether one more employee may be added to an account currently at `count`
    pub fn admits(&self, count: i32, limit: i32) -> bool {
        match self {
            QuotaPolicy::Permissive => count <= limit,
            QuotaPolicy::Strict => count < limit,
        }
    }
}

impl FromStr for QuotaPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(QuotaPolicy::Permissive),
            "strict" => Ok(QuotaPolicy::Strict),
            other => Err(UnknownVariant { kind: "quota policy", value: other.to_string() }),
        }
    }
}

// sqlx decodes TEXT columns into these through `#[sqlx(try_from = "String")]`
macro_rules! text_column {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = UnknownVariant;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

text_column!(Role, RequestStatus, AssetType);
