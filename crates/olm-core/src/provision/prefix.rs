// ── Address/prefix pairs ──

use std::fmt;
use std::net::IpAddr;

use crate::error::ProvisionError;

/// An address with a prefix length, e.g. `100.89.128.4/20`.
///
/// The prefix is checked against the address family on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpPrefix {
    addr: IpAddr,
    prefix: u8,
}

impl IpPrefix {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, ProvisionError> {
        if prefix > max_prefix(addr) {
            return Err(ProvisionError::InvalidPrefix {
                input: addr.to_string(),
                prefix,
            });
        }
        Ok(Self { addr, prefix })
    }

    /// Parse an address string and pair it with `prefix`.
    pub fn parse(addr: &str, prefix: u8) -> Result<Self, ProvisionError> {
        Self::new(parse_addr(addr)?, prefix)
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// A /0 route.
    pub fn is_default_route(&self) -> bool {
        self.prefix == 0
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

pub(crate) fn parse_addr(input: &str) -> Result<IpAddr, ProvisionError> {
    input
        .trim()
        .parse()
        .map_err(|_| ProvisionError::InvalidAddress {
            input: input.to_owned(),
        })
}

/// Parse CIDR notation. A bare address is a host prefix: /32 for IPv4,
/// /128 for IPv6.
pub fn parse_cidr(input: &str) -> Result<IpPrefix, ProvisionError> {
    let input = input.trim();
    let Some((addr, prefix)) = input.split_once('/') else {
        let addr = parse_addr(input)?;
        return IpPrefix::new(addr, max_prefix(addr));
    };
    let prefix: u8 = prefix
        .trim()
        .parse()
        .map_err(|_| ProvisionError::InvalidAddress {
            input: input.to_owned(),
        })?;
    IpPrefix::parse(addr, prefix).map_err(|e| match e {
        ProvisionError::InvalidPrefix { prefix, .. } => ProvisionError::InvalidPrefix {
            input: input.to_owned(),
            prefix,
        },
        other => other,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_prefix() {
        let p = parse_cidr("10.0.0.1/24").unwrap();
        assert_eq!(p.to_string(), "10.0.0.1/24");
        assert_eq!(p.prefix(), 24);
    }

    #[test]
    fn bare_addresses_are_host_prefixes() {
        assert_eq!(parse_cidr("10.0.0.1").unwrap().prefix(), 32);
        assert_eq!(parse_cidr("fd00::1").unwrap().prefix(), 128);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            parse_cidr("10.0.0.1/33"),
            Err(ProvisionError::InvalidPrefix { prefix: 33, .. })
        ));
        assert!(parse_cidr("fd00::/129").is_err());
        assert!(matches!(
            parse_cidr("not-an-ip/8"),
            Err(ProvisionError::InvalidAddress { .. })
        ));
        assert!(matches!(
            parse_cidr("10.0.0.0/x"),
            Err(ProvisionError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn default_route() {
        assert!(parse_cidr("0.0.0.0/0").unwrap().is_default_route());
    }
}
