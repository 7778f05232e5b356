//! Composite resource identifiers
//!
//! The host addresses every resource by an opaque string id. Composite ids
//! are slash-delimited decimal tuples with a fixed arity per resource type;
//! `Display` and `FromStr` are exact inverses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

fn parse_parts<const N: usize>(kind: &'static str, s: &str) -> Result<[i64; N], ProviderError> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != N {
        return Err(ProviderError::Invalid(format!(
            "invalid {kind} id {s:?}: expected {N} slash-separated parts, got {}",
            parts.len()
        )));
    }
    let mut out = [0i64; N];
    for (i, part) in parts.iter().enumerate() {
        out[i] = part.parse().map_err(|_| {
            ProviderError::Invalid(format!("invalid {kind} id {s:?}: {part:?} is not an integer"))
        })?;
    }
    Ok(out)
}

/// Identifies a subscription: `sub`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub i64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [sub] = parse_parts::<1>("subscription", s)?;
        Ok(Self(sub))
    }
}

/// Identifies a database within a subscription: `sub/db`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseId {
    pub subscription: i64,
    pub database: i64,
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription, self.database)
    }
}

impl FromStr for DatabaseId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [subscription, database] = parse_parts::<2>("database", s)?;
        Ok(Self {
            subscription,
            database,
        })
    }
}

/// Identifies a VPC peering: `sub/peering`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeeringId {
    pub subscription: i64,
    pub peering: i64,
}

impl fmt::Display for PeeringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription, self.peering)
    }
}

impl FromStr for PeeringId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [subscription, peering] = parse_parts::<2>("peering", s)?;
        Ok(Self {
            subscription,
            peering,
        })
    }
}

/// Identifies a TGW attachment: `sub/attachment`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TgwAttachmentId {
    pub subscription: i64,
    pub attachment: i64,
}

impl fmt::Display for TgwAttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription, self.attachment)
    }
}

impl FromStr for TgwAttachmentId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [subscription, attachment] = parse_parts::<2>("transit gateway attachment", s)?;
        Ok(Self {
            subscription,
            attachment,
        })
    }
}

/// Identifies a PSC service: `sub/pscService`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PscServiceId {
    pub subscription: i64,
    pub service: i64,
}

impl fmt::Display for PscServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription, self.service)
    }
}

impl FromStr for PscServiceId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [subscription, service] = parse_parts::<2>("PSC service", s)?;
        Ok(Self {
            subscription,
            service,
        })
    }
}

/// Identifies a PSC service in an Active-Active region: `sub/region/pscService`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPscServiceId {
    pub subscription: i64,
    pub region: i64,
    pub service: i64,
}

impl fmt::Display for RegionPscServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subscription, self.region, self.service)
    }
}

impl FromStr for RegionPscServiceId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [subscription, region, service] = parse_parts::<3>("regional PSC service", s)?;
        Ok(Self {
            subscription,
            region,
            service,
        })
    }
}

/// Identifies an ACL rule: `rule`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclRuleId(pub i64);

impl fmt::Display for AclRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AclRuleId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [rule] = parse_parts::<1>("ACL rule", s)?;
        Ok(Self(rule))
    }
}

/// Identifies a cloud account: `account`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudAccountId(pub i64);

impl fmt::Display for CloudAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CloudAccountId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [account] = parse_parts::<1>("cloud account", s)?;
        Ok(Self(account))
    }
}
