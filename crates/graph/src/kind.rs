// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;
use std::str::FromStr;

/// The closed set of resource kinds a tracker may represent.
///
/// Kinds are closed at compile time in practice (the provider's resource
/// model does not grow new kinds at runtime), so this is a tagged enum
/// rather than an open string, and dispatch to the right lister/deleter is
/// static.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Kind {
    Vpc,
    Subnet,
    RouteTable,
    SecurityGroup,
    Instance,
    Volume,
    DhcpOptions,
    InternetGateway,
    ElasticIp,
    LoadBalancer,
    AutoscalingGroup,
    LaunchConfig,
}

impl Kind {
    pub const ALL: [Kind; 12] = [
        Kind::Vpc,
        Kind::Subnet,
        Kind::RouteTable,
        Kind::SecurityGroup,
        Kind::Instance,
        Kind::Volume,
        Kind::DhcpOptions,
        Kind::InternetGateway,
        Kind::ElasticIp,
        Kind::LoadBalancer,
        Kind::AutoscalingGroup,
        Kind::LaunchConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Vpc => "vpc",
            Kind::Subnet => "subnet",
            Kind::RouteTable => "route-table",
            Kind::SecurityGroup => "security-group",
            Kind::Instance => "instance",
            Kind::Volume => "volume",
            Kind::DhcpOptions => "dhcp-options",
            Kind::InternetGateway => "internet-gateway",
            Kind::ElasticIp => "elastic-ip",
            Kind::LoadBalancer => "load-balancer",
            Kind::AutoscalingGroup => "autoscaling-group",
            Kind::LaunchConfig => "launchconfig",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Kind, String> {
        Kind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unrecognized resource kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::Kind;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_display_and_from_str() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_str(kind.as_str()).unwrap(), kind);
        }
    }
}
