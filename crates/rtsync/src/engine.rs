//! The synchronization engine.
//!
//! [`KernelSync`] owns one control socket for request/reply traffic and
//! three monitor sockets, one per multicast group. Keeping the control
//! handle free of subscriptions means an awaited acknowledgment can never
//! interleave with notifications, and keeping one monitor per group means
//! a burst in one group cannot overrun another's buffer.

use std::net::IpAddr;
use std::time::Duration;

use tokio::time::timeout;

use crate::builder::MessageBuilder;
use crate::error::{Error, Result};
use crate::events::parse_event;
use crate::handlers::{self, KernelOp};
use crate::iface::InterfaceRegistry;
use crate::message::{MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError, NlMsgHdr, NlMsgType};
use crate::route::{self, RouteAction, RouteDescriptor};
use crate::rule;
use crate::socket::NetlinkSocket;
use crate::types::{RtGenMsg, groups};

/// Tunables for socket and timing behavior.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Kernel send/receive buffer size per socket, in bytes.
    pub socket_buffer: usize,
    /// How long to wait for the acknowledgment of one request.
    pub ack_timeout: Duration,
    /// How long to wait between datagrams of an enumeration reply.
    pub dump_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            socket_buffer: 256 * 1024,
            ack_timeout: Duration::from_secs(2),
            dump_timeout: Duration::from_secs(10),
        }
    }
}

/// Which of the engine's sockets an operation runs on.
#[derive(Debug, Clone, Copy)]
enum Handle {
    Control,
    Monitor(usize),
}

/// Index into the monitor array for the link group. Route enumeration
/// borrows this handle, see [`KernelSync::initialize`].
const LINK_MONITOR: usize = 0;

/// Kernel routing state synchronizer.
///
/// Generic over the collaborator that owns interface configuration; the
/// engine feeds it kernel state and asks it which interfaces to manage.
pub struct KernelSync<R: InterfaceRegistry> {
    control: NetlinkSocket,
    monitors: [NetlinkSocket; 3],
    registry: R,
    opts: SyncOptions,
}

impl<R: InterfaceRegistry> KernelSync<R> {
    /// Open all four sockets and learn the kernel's current state:
    /// links first, then addresses, then IPv4 routes. Fails if any
    /// socket cannot be opened or any enumeration does not complete.
    pub async fn initialize(registry: R, opts: SyncOptions) -> Result<Self> {
        let control = NetlinkSocket::open(0, opts.socket_buffer)?;
        let monitors = [
            NetlinkSocket::open(groups::RTMGRP_LINK, opts.socket_buffer)?,
            NetlinkSocket::open(groups::RTMGRP_IPV4_IFADDR, opts.socket_buffer)?,
            NetlinkSocket::open(groups::RTMGRP_IPV4_ROUTE, opts.socket_buffer)?,
        ];
        let mut engine = Self {
            control,
            monitors,
            registry,
            opts,
        };

        engine
            .enumerate(Handle::Control, libc::AF_UNSPEC as u8, NlMsgType::RTM_GETLINK)
            .await?;
        engine
            .enumerate(Handle::Control, libc::AF_INET as u8, NlMsgType::RTM_GETADDR)
            .await?;
        // The route dump must not go out on the control handle: dump
        // records carry the requester's port, and records carrying the
        // control port would be dropped as echoes of our own requests.
        engine
            .enumerate(
                Handle::Monitor(LINK_MONITOR),
                libc::AF_INET as u8,
                NlMsgType::RTM_GETROUTE,
            )
            .await?;

        Ok(engine)
    }

    /// The collaborator this engine feeds.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the collaborator.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    fn socket(&self, handle: Handle) -> &NetlinkSocket {
        match handle {
            Handle::Control => &self.control,
            Handle::Monitor(i) => &self.monitors[i],
        }
    }

    /// Walk one kernel table: send a dump request and dispatch every
    /// record until the terminator for our sequence number arrives.
    ///
    /// On a monitor handle live notifications keep arriving interleaved
    /// with the dump records; they are dispatched through the normal
    /// path, not dropped. Link transitions in particular are
    /// edge-triggered and would otherwise be lost for good.
    async fn enumerate(&mut self, handle: Handle, family: u8, msg_type: u16) -> Result<()> {
        let seq = {
            let socket = self.socket(handle);
            let seq = socket.next_seq();
            let mut builder = dump_request(msg_type, family);
            builder.set_seq(seq);
            builder.set_pid(socket.pid());
            socket.send(&builder.finish()).await?;
            seq
        };

        let mut ops = Vec::new();
        'dump: loop {
            let data = {
                let socket = self.socket(handle);
                timeout(self.opts.dump_timeout, socket.recv_msg())
                    .await
                    .map_err(|_| Error::Timeout {
                        operation: "enumeration",
                    })??
            };
            for item in MessageIter::new(&data) {
                let (header, payload) = item?;
                match dump_step(header, payload, seq)? {
                    DumpStep::Finished => break 'dump,
                    DumpStep::Skip => {}
                    DumpStep::Dispatch => {
                        self.decode(header, payload, &mut ops)?;
                    }
                }
            }
        }

        // Requests decided during the walk go out only once the dump has
        // finished; sending them mid-dump would steal replies off the
        // socket we are still reading.
        for op in ops {
            self.execute(op).await;
        }
        Ok(())
    }

    /// Process notifications forever. Returns only on a socket-level
    /// failure.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.poll_once().await?;
        }
    }

    /// Wait for one socket to become readable and drain it.
    pub async fn poll_once(&mut self) -> Result<()> {
        let handle = tokio::select! {
            r = self.control.readable() => { r?; Handle::Control }
            r = self.monitors[0].readable() => { r?; Handle::Monitor(0) }
            r = self.monitors[1].readable() => { r?; Handle::Monitor(1) }
            r = self.monitors[2].readable() => { r?; Handle::Monitor(2) }
        };
        self.drain(handle).await
    }

    /// Read every queued datagram off one socket and dispatch its
    /// messages. A malformed message abandons its datagram but not the
    /// drain. A kernel-reported error ends the pass after logging but
    /// does not fail the caller: requests that care about their outcome
    /// await it in [`Self::transact`], so an error seen here is a stray
    /// one that must not take the whole loop down. Only I/O failures
    /// propagate.
    async fn drain(&mut self, handle: Handle) -> Result<()> {
        loop {
            let data = match self.socket(handle).try_recv().await? {
                Some(data) => data,
                None => return Ok(()),
            };

            let mut ops = Vec::new();
            let mut abort = false;
            for item in MessageIter::new(&data) {
                let (header, payload) = match item {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!("dropping malformed datagram tail: {}", e);
                        break;
                    }
                };
                match self.decode(header, payload, &mut ops) {
                    Ok(true) => {}
                    Ok(false) => {
                        abort = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("dropping malformed datagram tail: {}", e);
                        break;
                    }
                }
            }
            for op in ops {
                self.execute(op).await;
            }
            if abort {
                return Ok(());
            }
        }
    }

    /// Decode one message, collecting the kernel requests it implies.
    /// Returns `Ok(false)` when the rest of the pass should be abandoned.
    fn decode(&mut self, header: &NlMsgHdr, payload: &[u8], ops: &mut Vec<KernelOp>) -> Result<bool> {
        match header.nlmsg_type {
            NlMsgType::DONE | NlMsgType::NOOP => Ok(true),
            NlMsgType::ERROR => {
                let err = NlMsgError::from_bytes(payload)?;
                if err.is_ack() {
                    // Late acknowledgment of a request that already
                    // timed out.
                    Ok(true)
                } else {
                    tracing::error!("kernel reported: {}", Error::from_errno(err.error));
                    Ok(false)
                }
            }
            _ => {
                match parse_event(header.nlmsg_type, payload)? {
                    Some(event) => ops.extend(handlers::handle_event(
                        &mut self.registry,
                        &event,
                        header.nlmsg_pid,
                        self.control.pid(),
                    )),
                    None => tracing::info!(
                        "ignoring message type {} ({} payload bytes)",
                        header.nlmsg_type,
                        header.payload_len()
                    ),
                }
                Ok(true)
            }
        }
    }

    /// Issue one decided request; failures are logged, never fatal.
    async fn execute(&mut self, op: KernelOp) {
        let result = match op {
            KernelOp::RouteModify {
                action,
                route,
                ifindex,
                table,
            } => self.modify_route(action, &route, ifindex, table).await,
            KernelOp::RuleReplace { addr, table } => self.replace_rule(addr, table).await,
            KernelOp::RuleRemove { addr, table } => self.remove_rule(addr, table).await,
        };
        if let Err(e) = result {
            tracing::warn!("kernel request failed: {}", e);
        }
    }

    /// Send one request on the control handle and wait for its
    /// acknowledgment.
    async fn transact(&self, mut builder: MessageBuilder) -> Result<()> {
        let seq = self.control.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.control.pid());
        self.control.send(&builder.finish()).await?;
        self.await_ack(seq).await
    }

    async fn await_ack(&self, seq: u32) -> Result<()> {
        let reply = timeout(self.opts.ack_timeout, async {
            loop {
                let data = self.control.recv_msg().await?;
                for item in MessageIter::new(&data) {
                    let (header, payload) = item?;
                    // Replies to earlier requests that already timed out
                    // may still be queued ahead of ours.
                    if header.nlmsg_seq != seq || !header.is_error() {
                        continue;
                    }
                    let err = NlMsgError::from_bytes(payload)?;
                    if err.is_ack() {
                        return Ok(());
                    }
                    return Err(Error::from_errno(err.error));
                }
            }
        })
        .await;

        match reply {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                operation: "acknowledgment",
            }),
        }
    }

    /// Add or delete one route in the given table, bound to `ifindex`
    /// when nonzero.
    pub async fn modify_route(
        &self,
        action: RouteAction,
        route: &RouteDescriptor,
        ifindex: u32,
        table: u32,
    ) -> Result<()> {
        let builder = route::route_request(action, route, ifindex, table)?;
        self.transact(builder)
            .await
            .map_err(|e| e.with_context("route change"))
    }

    /// Replace the default route in `table` with one balanced across
    /// every eligible interface. With no eligible interface this is a
    /// no-op.
    pub async fn replace_multipath_route(&self, table: u32) -> Result<()> {
        let interfaces = self.registry.interfaces();
        match route::multipath_request(&interfaces, table)? {
            Some(builder) => self
                .transact(builder)
                .await
                .map_err(|e| e.with_context("multipath route")),
            None => Ok(()),
        }
    }

    /// Point traffic sourced from `addr` at `table`. Any rule left over
    /// for the same source is withdrawn first.
    pub async fn replace_rule(&self, addr: IpAddr, table: u32) -> Result<()> {
        match self
            .transact(rule::rule_request(RouteAction::Delete, addr, table)?)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.with_context("rule delete")),
        }
        self.transact(rule::rule_request(RouteAction::Add, addr, table)?)
            .await
            .map_err(|e| e.with_context("rule add"))
    }

    /// Withdraw the rule for `addr`. Missing rules are not an error.
    pub async fn remove_rule(&self, addr: IpAddr, table: u32) -> Result<()> {
        match self
            .transact(rule::rule_request(RouteAction::Delete, addr, table)?)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.with_context("rule delete")),
        }
    }

    /// Install the source rule for a named interface from its stored
    /// primary address. Does nothing if no address is known yet.
    pub async fn install_interface_rule(&mut self, name: &str) -> Result<()> {
        let (addr, table) = {
            let iface = self
                .registry
                .by_name(name)
                .ok_or_else(|| Error::InterfaceNotFound {
                    name: name.to_string(),
                })?;
            let Some(addr) = iface.primary_addr else {
                return Ok(());
            };
            (addr, iface.route_table)
        };
        self.replace_rule(addr, table).await
    }

    /// Withdraw the source rule for a named interface. Does nothing if no
    /// address is stored.
    pub async fn remove_interface_rule(&mut self, name: &str) -> Result<()> {
        let (addr, table) = {
            let iface = self
                .registry
                .by_name(name)
                .ok_or_else(|| Error::InterfaceNotFound {
                    name: name.to_string(),
                })?;
            let Some(addr) = iface.primary_addr else {
                return Ok(());
            };
            (addr, iface.route_table)
        };
        self.remove_rule(addr, table).await
    }
}

/// Build a table dump request for one message type and address family.
fn dump_request(msg_type: u16, family: u8) -> MessageBuilder {
    let mut builder = MessageBuilder::new(msg_type, NLM_F_REQUEST | NLM_F_DUMP);
    builder.append_header(&RtGenMsg::new(family));
    builder
}

/// How one message in an enumeration reply advances the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DumpStep {
    /// Terminator for this dump.
    Finished,
    /// Bookkeeping for this dump with nothing to dispatch.
    Skip,
    /// A dump record, or an unrelated message that arrived interleaved
    /// (unsolicited notifications carry sequence number zero). Both go
    /// through the normal dispatch path.
    Dispatch,
}

fn dump_step(header: &NlMsgHdr, payload: &[u8], seq: u32) -> Result<DumpStep> {
    if header.nlmsg_seq != seq {
        return Ok(DumpStep::Dispatch);
    }
    if header.is_done() {
        return Ok(DumpStep::Finished);
    }
    if header.is_error() {
        let err = NlMsgError::from_bytes(payload)?;
        if !err.is_ack() {
            return Err(Error::from_errno(err.error).with_context("enumeration"));
        }
        return Ok(DumpStep::Skip);
    }
    Ok(DumpStep::Dispatch)
}
