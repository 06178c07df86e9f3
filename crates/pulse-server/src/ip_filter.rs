//! Trusted-subnet check on the client-reported address.
//!
//! The same [`IpFilter`] backs the HTTP middleware and the gRPC interceptor.

use std::net::IpAddr;
use std::str::FromStr;

/// Header (and gRPC metadata key) carrying the client address.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// An IPv4 or IPv6 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: IpAddr,
    prefix: u8,
}

impl Subnet {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            (IpAddr::V4(_), IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
                Some(v4) => self.contains(IpAddr::V4(v4)),
                None => false,
            },
            (IpAddr::V6(_), IpAddr::V4(_)) => false,
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for Subnet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length in '{s}'"))?;
        let network: IpAddr = addr
            .parse()
            .map_err(|e| format!("invalid network address '{addr}': {e}"))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|e| format!("invalid prefix length '{prefix}': {e}"))?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(format!("prefix length {prefix} exceeds {max}"));
        }
        Ok(Self { network, prefix })
    }
}

#[derive(Debug, Clone, Default)]
pub struct IpFilter {
    subnet: Option<Subnet>,
}

impl IpFilter {
    /// Builds the filter; an empty or unparsable CIDR disables it.
    pub fn from_cidr(cidr: Option<&str>) -> Self {
        let Some(cidr) = cidr.map(str::trim).filter(|c| !c.is_empty()) else {
            return Self::default();
        };
        match cidr.parse::<Subnet>() {
            Ok(subnet) => {
                tracing::info!(subnet = %cidr, "Trusted subnet filter enabled");
                Self {
                    subnet: Some(subnet),
                }
            }
            Err(e) => {
                tracing::warn!(subnet = %cidr, error = %e, "Invalid trusted subnet, filter disabled");
                Self::default()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.subnet.is_some()
    }

    /// Decides on the raw header value.
    ///
    /// A missing or blank header passes even when the filter is enabled; any
    /// other value must parse and fall inside the subnet.
    pub fn allows(&self, real_ip: Option<&str>) -> bool {
        let real_ip = real_ip.map(str::trim).filter(|raw| !raw.is_empty());
        let (Some(subnet), Some(raw)) = (self.subnet, real_ip) else {
            return true;
        };
        raw.parse::<IpAddr>()
            .is_ok_and(|ip| subnet.contains(ip))
    }
}
