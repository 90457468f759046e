// ── Tunnel interface provisioning ──
//
// Builder protocol the engine drives to obtain an OS tunnel, the socket
// protect hook, and the one-shot interface handle.

mod plan;
mod prefix;
mod provisioner;

pub use plan::{InterfacePlan, provision_and_detach};
pub use prefix::{IpPrefix, parse_cidr};
pub use provisioner::{
    InterfaceHandle, TunnelBuilder, TunnelInterfaceSpec, TunnelPlatform, TunnelProvisioner,
};
