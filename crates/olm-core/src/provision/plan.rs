// ── Interface plan ──
//
// The standard sequence an engine runs against a builder: MTU, tunnel
// address, utility route, default route, extra routes, DNS. MTU, address
// and the default route are required; the rest are best effort.

use std::os::fd::RawFd;
use std::sync::Arc;

use tracing::{info, warn};

use super::prefix::parse_cidr;
use super::provisioner::{TunnelBuilder, TunnelProvisioner};
use crate::error::ProvisionError;

/// What the engine wants the tunnel to look like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfacePlan {
    /// CIDR or bare address; bare means a host prefix.
    pub tunnel_ip: String,
    pub mtu: u32,
    pub dns: Option<String>,
    /// Extra routes in CIDR notation.
    pub routes: Vec<String>,
    /// Subnet for engine-local services such as the DNS proxy.
    pub utility_subnet: Option<String>,
}

impl InterfacePlan {
    /// Apply the plan to `builder` in order.
    pub fn apply(&self, builder: &mut TunnelBuilder) -> Result<(), ProvisionError> {
        builder.set_mtu(self.mtu)?;

        let addr = parse_cidr(&self.tunnel_ip)?;
        builder.add_address(&addr.addr().to_string(), addr.prefix())?;

        if let Some(subnet) = self.utility_subnet.as_deref().filter(|s| !s.is_empty()) {
            if let Err(e) = add_cidr_route(builder, subnet) {
                warn!(subnet, error = %e, "failed to add utility subnet route");
            }
        }

        builder.add_route("0.0.0.0", 0)?;

        for route in &self.routes {
            if let Err(e) = add_cidr_route(builder, route) {
                warn!(route = %route, error = %e, "failed to add route");
            }
        }

        if let Some(dns) = self.dns.as_deref().filter(|s| !s.is_empty()) {
            if let Err(e) = builder.add_dns_server(dns) {
                warn!(dns, error = %e, "failed to add DNS server");
            }
        }

        Ok(())
    }
}

fn add_cidr_route(builder: &mut TunnelBuilder, cidr: &str) -> Result<(), ProvisionError> {
    let route = parse_cidr(cidr)?;
    builder.add_route(&route.addr().to_string(), route.prefix())?;
    Ok(())
}

/// Build, establish and detach in one go, returning the raw descriptor the
/// engine will own from now on.
pub fn provision_and_detach(
    provisioner: &Arc<TunnelProvisioner>,
    plan: &InterfacePlan,
) -> Result<RawFd, ProvisionError> {
    info!(tunnel_ip = %plan.tunnel_ip, mtu = plan.mtu, "establishing tunnel");
    let mut builder = provisioner.new_builder()?;
    plan.apply(&mut builder)?;
    let mut handle = builder.establish()?;
    let fd = handle.detach()?;
    info!(fd, "tunnel established and handed off");
    Ok(fd)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::os::fd::OwnedFd;
    use std::sync::Mutex;

    use super::*;
    use crate::provision::{TunnelInterfaceSpec, TunnelPlatform};

    #[derive(Default)]
    struct CapturingPlatform {
        spec: Mutex<Option<TunnelInterfaceSpec>>,
    }

    impl TunnelPlatform for CapturingPlatform {
        fn establish(&self, spec: &TunnelInterfaceSpec) -> io::Result<OwnedFd> {
            *self.spec.lock().unwrap() = Some(spec.clone());
            Ok(OwnedFd::from(tempfile::tempfile()?))
        }

        fn protect(&self, _fd: RawFd) -> bool {
            true
        }
    }

    fn setup() -> (Arc<TunnelProvisioner>, Arc<CapturingPlatform>) {
        let provisioner = Arc::new(TunnelProvisioner::new());
        let platform = Arc::new(CapturingPlatform::default());
        provisioner.attach_service(platform.clone());
        provisioner.begin_attempt();
        (provisioner, platform)
    }

    #[test]
    fn full_plan_produces_expected_spec() {
        let (provisioner, platform) = setup();
        let plan = InterfacePlan {
            tunnel_ip: "100.89.128.4/20".into(),
            mtu: 1280,
            dns: Some("100.96.128.1".into()),
            routes: vec!["10.1.0.0/16".into(), "bogus".into()],
            utility_subnet: Some("100.96.128.0/24".into()),
        };

        let fd = provision_and_detach(&provisioner, &plan).unwrap();
        assert!(fd >= 0);

        let spec = platform.spec.lock().unwrap().clone().unwrap();
        assert_eq!(spec.mtu, Some(1280));
        let addrs: Vec<String> = spec.addresses.iter().map(ToString::to_string).collect();
        assert_eq!(addrs, vec!["100.89.128.4/20"]);
        let routes: Vec<String> = spec.routes.iter().map(ToString::to_string).collect();
        assert_eq!(routes, vec!["0.0.0.0/0", "10.1.0.0/16", "100.96.128.0/24"]);
        assert_eq!(spec.dns_servers.len(), 1);
    }

    #[test]
    fn bad_tunnel_ip_is_fatal() {
        let (provisioner, platform) = setup();
        let plan = InterfacePlan {
            tunnel_ip: "nope".into(),
            mtu: 1420,
            ..InterfacePlan::default()
        };
        assert!(matches!(
            provision_and_detach(&provisioner, &plan),
            Err(ProvisionError::InvalidAddress { .. })
        ));
        assert!(platform.spec.lock().unwrap().is_none());
    }

    #[test]
    fn bare_tunnel_ip_is_a_host_address() {
        let (provisioner, platform) = setup();
        let plan = InterfacePlan {
            tunnel_ip: "100.89.128.4".into(),
            mtu: 1420,
            ..InterfacePlan::default()
        };
        provision_and_detach(&provisioner, &plan).unwrap();
        let spec = platform.spec.lock().unwrap().clone().unwrap();
        assert_eq!(spec.addresses.iter().next().unwrap().prefix(), 32);
    }
}
