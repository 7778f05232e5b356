//! IPv4 CIDR validation
//!
//! Deployment CIDRs, allowlist entries, and peering routes are validated at
//! plan time so malformed values fail before any API call.

use std::net::Ipv4Addr;

use crate::error::{ProviderError, Result};

/// Validate an `a.b.c.d/len` IPv4 CIDR block
pub fn validate_cidr(field: &str, value: &str) -> Result<()> {
    let (addr, len) = value.split_once('/').ok_or_else(|| {
        ProviderError::Invalid(format!("{field}: {value:?} is not a CIDR block"))
    })?;
    addr.parse::<Ipv4Addr>().map_err(|_| {
        ProviderError::Invalid(format!("{field}: {addr:?} is not an IPv4 address"))
    })?;
    let len: u8 = len.parse().map_err(|_| {
        ProviderError::Invalid(format!("{field}: {len:?} is not a prefix length"))
    })?;
    if len > 32 {
        return Err(ProviderError::Invalid(format!(
            "{field}: prefix length {len} is out of range"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cidrs() {
        validate_cidr("deployment_cidr", "10.0.0.0/24").unwrap();
        validate_cidr("deployment_cidr", "192.168.1.0/32").unwrap();
        validate_cidr("deployment_cidr", "0.0.0.0/0").unwrap();
    }

    #[test]
    fn test_invalid_cidrs() {
        assert!(validate_cidr("vpc_cidr", "10.0.0.0").is_err());
        assert!(validate_cidr("vpc_cidr", "10.0.0.0/33").is_err());
        assert!(validate_cidr("vpc_cidr", "10.0.0/24").is_err());
        assert!(validate_cidr("vpc_cidr", "example/24").is_err());
        assert!(validate_cidr("vpc_cidr", "10.0.0.0/abc").is_err());
    }

    #[test]
    fn test_error_names_field() {
        let err = validate_cidr("deployment_cidr", "bogus").unwrap_err();
        assert!(err.to_string().contains("deployment_cidr"));
    }
}
