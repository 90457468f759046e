// ── Tunnel interface provisioning ──
//
// The engine asks for an OS tunnel through a builder: accumulate MTU,
// addresses, routes and DNS servers, then `establish` once. The resulting
// `InterfaceHandle` owns the descriptor until `detach` hands it over.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::net::IpAddr;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::prefix::{IpPrefix, parse_addr};
use crate::config::{MAX_MTU, MIN_MTU};
use crate::error::ProvisionError;

// ── Platform seam ────────────────────────────────────────────────────

/// The OS side of provisioning, implemented by the host's VPN service.
pub trait TunnelPlatform: Send + Sync + 'static {
    /// Create the tunnel interface described by `spec`.
    ///
    /// Either returns a live descriptor or fails having created nothing.
    fn establish(&self, spec: &TunnelInterfaceSpec) -> io::Result<OwnedFd>;

    /// Exclude a socket from the tunnel. Must not affect any interface.
    fn protect(&self, fd: RawFd) -> bool;
}

/// The interface being described, before `establish`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelInterfaceSpec {
    pub mtu: Option<u32>,
    pub addresses: BTreeSet<IpPrefix>,
    pub routes: BTreeSet<IpPrefix>,
    /// In the order they were added. Duplicates are dropped.
    pub dns_servers: Vec<IpAddr>,
}

impl TunnelInterfaceSpec {
    fn check_usable(&self) -> Result<(), ProvisionError> {
        if self.mtu.is_none() {
            return Err(ProvisionError::UnusableSpec {
                reason: "no MTU set",
            });
        }
        if self.addresses.is_empty() {
            return Err(ProvisionError::UnusableSpec {
                reason: "no interface address",
            });
        }
        Ok(())
    }
}

// ── Provisioner ──────────────────────────────────────────────────────

struct Service {
    id: Uuid,
    platform: Arc<dyn TunnelPlatform>,
}

#[derive(Debug, Default)]
struct Attempt {
    generation: u64,
    established: bool,
}

/// Shared provisioning context for one coordinator.
///
/// The host attaches its VPN service here; the engine gets builders from it.
/// Each connect attempt may establish one interface.
#[derive(Default)]
pub struct TunnelProvisioner {
    service: ArcSwapOption<Service>,
    attempt: Mutex<Attempt>,
}

impl fmt::Debug for TunnelProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelProvisioner")
            .field("service_id", &self.service_id())
            .finish_non_exhaustive()
    }
}

impl TunnelProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    fn attempt(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Service attachment ───────────────────────────────────────────

    /// Register the host VPN service. Replaces any previous one.
    pub fn attach_service(&self, platform: Arc<dyn TunnelPlatform>) -> Uuid {
        let id = Uuid::new_v4();
        self.service.store(Some(Arc::new(Service { id, platform })));
        info!(service_id = %id, "VPN service attached");
        id
    }

    /// Unregister the service, but only if `id` is still the attached one.
    pub fn detach_service(&self, id: Uuid) -> bool {
        let current = self.service.load();
        let Some(service) = (*current).as_ref().filter(|s| s.id == id) else {
            debug!(service_id = %id, "ignoring detach for a service that is not attached");
            return false;
        };
        let prev = self.service.compare_and_swap(service, None);
        let detached = (*prev).as_ref().is_some_and(|s| s.id == id);
        if detached {
            info!(service_id = %id, "VPN service detached");
        }
        detached
    }

    pub fn service_id(&self) -> Option<Uuid> {
        (*self.service.load()).as_ref().map(|s| s.id)
    }

    // ── Engine-facing calls ──────────────────────────────────────────

    /// Keep the engine's own socket out of the tunnel.
    pub fn protect(&self, fd: RawFd) -> bool {
        let Some(service) = self.service.load_full() else {
            warn!(fd, "no VPN service attached, cannot protect socket");
            return false;
        };
        let protected = service.platform.protect(fd);
        if protected {
            debug!(fd, "socket protected");
        } else {
            warn!(fd, "failed to protect socket");
        }
        protected
    }

    /// Start describing a new tunnel interface for the current attempt.
    pub fn new_builder(self: &Arc<Self>) -> Result<TunnelBuilder, ProvisionError> {
        let service = self.service.load_full().ok_or(ProvisionError::NoService)?;
        let generation = self.attempt().generation;
        Ok(TunnelBuilder {
            provisioner: Arc::clone(self),
            platform: Arc::clone(&service.platform),
            generation,
            spec: TunnelInterfaceSpec::default(),
        })
    }

    // ── Attempt bookkeeping (coordinator) ────────────────────────────

    /// A new connect attempt begins; outstanding builders go stale.
    pub(crate) fn begin_attempt(&self) {
        let mut attempt = self.attempt();
        attempt.generation += 1;
        attempt.established = false;
    }

    /// The session ended; outstanding builders go stale.
    pub(crate) fn end_attempt(&self) {
        self.begin_attempt();
    }

    fn claim(&self, generation: u64) -> Result<(), ProvisionError> {
        let mut attempt = self.attempt();
        if attempt.generation != generation {
            return Err(ProvisionError::StaleAttempt);
        }
        if attempt.established {
            return Err(ProvisionError::AlreadyEstablished);
        }
        attempt.established = true;
        Ok(())
    }

    fn release(&self, generation: u64) {
        let mut attempt = self.attempt();
        if attempt.generation == generation {
            attempt.established = false;
        }
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// Accumulates a [`TunnelInterfaceSpec`]; consumed by `establish`.
pub struct TunnelBuilder {
    provisioner: Arc<TunnelProvisioner>,
    platform: Arc<dyn TunnelPlatform>,
    generation: u64,
    spec: TunnelInterfaceSpec,
}

impl fmt::Debug for TunnelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelBuilder")
            .field("generation", &self.generation)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl TunnelBuilder {
    /// Last write wins.
    pub fn set_mtu(&mut self, mtu: u32) -> Result<&mut Self, ProvisionError> {
        if !(MIN_MTU..=MAX_MTU).contains(&mtu) {
            return Err(ProvisionError::InvalidMtu { mtu });
        }
        self.spec.mtu = Some(mtu);
        Ok(self)
    }

    pub fn add_address(&mut self, addr: &str, prefix: u8) -> Result<&mut Self, ProvisionError> {
        self.spec.addresses.insert(IpPrefix::parse(addr, prefix)?);
        Ok(self)
    }

    pub fn add_route(&mut self, route: &str, prefix: u8) -> Result<&mut Self, ProvisionError> {
        self.spec.routes.insert(IpPrefix::parse(route, prefix)?);
        Ok(self)
    }

    pub fn add_dns_server(&mut self, addr: &str) -> Result<&mut Self, ProvisionError> {
        let addr = parse_addr(addr)?;
        if !self.spec.dns_servers.contains(&addr) {
            self.spec.dns_servers.push(addr);
        }
        Ok(self)
    }

    pub fn spec(&self) -> &TunnelInterfaceSpec {
        &self.spec
    }

    /// Create the OS interface. At most one succeeds per connect attempt.
    pub fn establish(self) -> Result<InterfaceHandle, ProvisionError> {
        self.spec.check_usable()?;
        self.provisioner.claim(self.generation)?;

        match self.platform.establish(&self.spec) {
            Ok(fd) => {
                info!(
                    fd = fd.as_raw_fd(),
                    addresses = self.spec.addresses.len(),
                    routes = self.spec.routes.len(),
                    "tunnel interface established"
                );
                Ok(InterfaceHandle { fd: Some(fd) })
            }
            Err(e) => {
                self.provisioner.release(self.generation);
                warn!(error = %e, "OS refused tunnel interface");
                Err(ProvisionError::Denied(e))
            }
        }
    }
}

// ── Handle ───────────────────────────────────────────────────────────

/// Exclusive owner of a live tunnel descriptor.
///
/// Dropping an undetached handle closes the interface.
#[derive(Debug)]
pub struct InterfaceHandle {
    fd: Option<OwnedFd>,
}

impl InterfaceHandle {
    /// Hand raw ownership to the engine. Succeeds once.
    pub fn detach(&mut self) -> Result<RawFd, ProvisionError> {
        let fd = self.fd.take().ok_or(ProvisionError::AlreadyDetached)?;
        Ok(fd.into_raw_fd())
    }

    pub fn is_detached(&self) -> bool {
        self.fd.is_none()
    }

    /// The descriptor while still owned here.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(AsRawFd::as_raw_fd)
    }
}

impl Drop for InterfaceHandle {
    fn drop(&mut self) {
        if let Some(fd) = &self.fd {
            debug!(fd = fd.as_raw_fd(), "closing undetached tunnel interface");
        }
    }
}
