//! Notification handlers.
//!
//! Handlers are pure with respect to the kernel: they mutate the
//! collaborator's interface collection and return the kernel requests the
//! engine should issue, in order. That keeps every decision in this file
//! testable without a netlink socket.

use std::net::IpAddr;

use crate::events::RtnlEvent;
use crate::iface::InterfaceRegistry;
use crate::messages::{AddressMessage, LinkMessage, RouteMessage};
use crate::route::{RouteAction, RouteDescriptor};
use crate::types::route::rt_table;

/// A kernel request decided by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelOp {
    /// Mirror a route into an interface's private table.
    RouteModify {
        action: RouteAction,
        route: RouteDescriptor,
        ifindex: u32,
        table: u32,
    },
    /// Install (replacing any previous) the source rule for an address.
    RuleReplace { addr: IpAddr, table: u32 },
    /// Withdraw the source rule for an address.
    RuleRemove { addr: IpAddr, table: u32 },
}

/// Dispatch one event to its handler.
///
/// `sender_pid` is the netlink port the notification came from;
/// `control_pid` is our control handle's port. Route notifications
/// matching the control port are echoes of our own mirror requests and
/// are dropped here.
pub fn handle_event<R: InterfaceRegistry>(
    registry: &mut R,
    event: &RtnlEvent,
    sender_pid: u32,
    control_pid: u32,
) -> Vec<KernelOp> {
    let mut ops = Vec::new();
    match event {
        RtnlEvent::NewLink(msg) => on_new_link(registry, msg),
        RtnlEvent::DelLink(msg) => on_del_link(registry, msg),
        RtnlEvent::NewAddress(msg) => on_new_address(registry, msg, &mut ops),
        RtnlEvent::DelAddress(msg) => on_del_address(registry, msg, &mut ops),
        RtnlEvent::NewRoute(msg) => {
            on_route(registry, RouteAction::Add, msg, sender_pid, control_pid, &mut ops)
        }
        RtnlEvent::DelRoute(msg) => on_route(
            registry,
            RouteAction::Delete,
            msg,
            sender_pid,
            control_pid,
            &mut ops,
        ),
    }
    ops
}

fn on_new_link<R: InterfaceRegistry>(registry: &mut R, msg: &LinkMessage) {
    // Administratively up but without carrier is not a usable link.
    if !msg.is_lower_up() {
        return;
    }
    let Some(name) = msg.name() else {
        return;
    };
    let Some(iface) = registry.by_name(name) else {
        return;
    };
    if iface.index == 0 || msg.is_up_transition() {
        tracing::info!("interface {}: got link (index {})", name, msg.index());
    }
    iface.index = msg.index();
    iface.has_link = true;
    registry.link_bound(name);
}

fn on_del_link<R: InterfaceRegistry>(registry: &mut R, msg: &LinkMessage) {
    let Some(name) = msg.name() else {
        return;
    };
    if let Some(iface) = registry.by_name(name) {
        tracing::info!("interface {}: deleted", name);
        iface.index = 0;
        iface.has_link = false;
    }
}

fn on_new_address<R: InterfaceRegistry>(
    registry: &mut R,
    msg: &AddressMessage,
    ops: &mut Vec<KernelOp>,
) {
    if msg.is_secondary() {
        return;
    }
    let Some(local) = msg.local() else {
        return;
    };
    // Source rules are IPv4-only here.
    if !local.is_ipv4() {
        return;
    }
    let index = msg.index();
    let Some(iface) = registry.by_index(index) else {
        return;
    };
    tracing::info!(
        "interface {}: address {}/{}",
        iface.name,
        local,
        msg.prefix_len()
    );
    let table = iface.route_table;
    registry.set_local_address(index, Some(local));
    ops.push(KernelOp::RuleReplace { addr: local, table });
}

fn on_del_address<R: InterfaceRegistry>(
    registry: &mut R,
    msg: &AddressMessage,
    ops: &mut Vec<KernelOp>,
) {
    if msg.is_secondary() {
        return;
    }
    if msg.local().is_none() {
        return;
    }
    let index = msg.index();
    let Some(iface) = registry.by_index(index) else {
        return;
    };
    tracing::info!("interface {}: address removed", iface.name);
    let table = iface.route_table;
    // The rule to withdraw is keyed by the address we had stored, which
    // the notification no longer carries.
    let old = iface.primary_addr;
    registry.set_local_address(index, None);
    if let Some(addr) = old {
        ops.push(KernelOp::RuleRemove { addr, table });
    }
}

fn on_route<R: InterfaceRegistry>(
    registry: &mut R,
    action: RouteAction,
    msg: &RouteMessage,
    sender_pid: u32,
    control_pid: u32,
    ops: &mut Vec<KernelOp>,
) {
    // Mirroring a main-table route into a private table makes the kernel
    // echo our own request back; the sender port identifies those.
    if sender_pid == control_pid {
        return;
    }
    let Some(oif) = msg.oif() else {
        return;
    };
    if !msg.is_ipv4() || msg.table_id() != rt_table::MAIN {
        return;
    }
    let Some(iface) = registry.by_index(oif) else {
        return;
    };

    let route = msg.to_descriptor();
    tracing::debug!(
        "interface {}: {} route {}/{} via {:?}",
        iface.name,
        match action {
            RouteAction::Add => "new",
            RouteAction::Delete => "del",
        },
        route.dest,
        route.dst_len,
        route.gateway,
    );

    let name = iface.name.clone();
    let ifindex = iface.index;
    let table = iface.route_table;
    ops.push(KernelOp::RouteModify {
        action,
        route: route.clone(),
        ifindex,
        table,
    });

    if route.is_default() {
        registry.gateway_action(&name, &route, action);
    }
}
