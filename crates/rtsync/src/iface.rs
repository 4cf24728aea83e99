//! Interface model and the collaborator seam.
//!
//! The engine never owns interfaces. The daemon hands it an
//! [`InterfaceRegistry`] and the notification handlers read and update the
//! entries through it.

use std::net::IpAddr;

use crate::route::{RouteAction, RouteDescriptor};

/// One managed interface as the daemon configured it, enriched with what
/// the kernel has told us so far.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    /// Interface name, the configuration key.
    pub name: String,
    /// Kernel interface index; 0 while the device does not exist.
    pub index: u32,
    /// Primary IPv4 address, as last reported by the kernel.
    pub primary_addr: Option<IpAddr>,
    /// Private routing table this interface's routes are mirrored into.
    pub route_table: u32,
    /// Carrier is up.
    pub has_link: bool,
    /// Participates in the multipath default route.
    pub balance: bool,
    /// Nexthop weight when balancing.
    pub balance_weight: u8,
    /// Gateways reachable through this interface, in preference order.
    pub gateways: Vec<IpAddr>,
}

impl Interface {
    /// Qualifies for a nexthop in the multipath default route.
    pub fn is_multipath_candidate(&self) -> bool {
        self.balance && self.index != 0 && !self.gateways.is_empty()
    }
}

/// What the engine needs from the daemon's interface collection.
///
/// Lookups hand out mutable entries; the callbacks let the daemon react to
/// state the kernel pushed (rebinding its probe sockets, re-evaluating
/// gateway health) without the engine knowing any of that machinery.
pub trait InterfaceRegistry {
    /// Look up a managed interface by configured name.
    fn by_name(&mut self, name: &str) -> Option<&mut Interface>;

    /// Look up a managed interface by kernel index.
    fn by_index(&mut self, index: u32) -> Option<&mut Interface>;

    /// Snapshot of all managed interfaces, for the multipath builder.
    fn interfaces(&self) -> Vec<Interface>;

    /// Store (or clear) the primary address of the interface at `index`.
    fn set_local_address(&mut self, index: u32, addr: Option<IpAddr>) {
        if let Some(iface) = self.by_index(index) {
            iface.primary_addr = addr;
        }
    }

    /// The named interface came up (or changed index); sockets bound to
    /// the device need (re)binding.
    fn link_bound(&mut self, name: &str);

    /// A default route through the named interface appeared or vanished
    /// in the kernel's main table.
    fn gateway_action(&mut self, name: &str, route: &RouteDescriptor, action: RouteAction);
}
