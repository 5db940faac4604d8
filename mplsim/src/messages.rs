// MplsSim: Simulating MPLS Traffic-Engineering Signaling
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module containing definitions for the signaling messages (RSVP-TE and
//! LDP) and the objects they carry.

use crate::types::{Bandwidth, InterfaceAddr, Label, LspId, Metric, RouterAddr};

/// Number of filter-spec slots in reservation state blocks and flow
/// descriptor lists. Slots are identified positionally.
pub const FLOW_SLOTS: usize = 5;

/// Session object: identifies one traffic-engineering tunnel. A session may
/// carry multiple LSPs over its lifetime (e.g. during a reroute).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionObj {
    /// Destination address of the tunnel
    pub dest: RouterAddr,
    /// Protocol id
    pub protocol_id: u8,
    /// Destination port
    pub dest_port: u16,
    /// Setup priority (0 = highest)
    pub setup_pri: u8,
    /// Holding priority (0 = highest)
    pub holding_pri: u8,
    /// Tunnel id (doubles as the reservation handle)
    pub tunnel_id: u32,
    /// Extended tunnel id
    pub ext_tunnel_id: u32,
}

impl SessionObj {
    /// Two messages/blocks are "in the same session" when destination,
    /// protocol id and destination port agree.
    pub fn same_session(&self, other: &SessionObj) -> bool {
        self.dest == other.dest
            && self.protocol_id == other.protocol_id
            && self.dest_port == other.dest_port
    }
}

/// Sender template: identifies one sender (one LSP) within a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SenderTemplate {
    /// Source address
    pub src: RouterAddr,
    /// Source port
    pub src_port: u16,
    /// LSP id (see [`LspId::reroute_twin`])
    pub lsp_id: LspId,
}

/// Filter specs carry the same fields as sender templates.
pub type FilterSpec = SenderTemplate;

/// Flow specification: requested bandwidth and delay. Also used as the
/// sender Tspec.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowSpec {
    /// Requested bandwidth
    pub bandwidth: Bandwidth,
    /// Requested link delay
    pub delay: Metric,
}

impl FlowSpec {
    /// New flowspec.
    pub fn new(bandwidth: Bandwidth, delay: Metric) -> Self {
        Self { bandwidth, delay }
    }

    /// Elementwise maximum (the least upper bound used when merging
    /// reservations sharing an interface).
    pub fn lub(&self, other: &FlowSpec) -> FlowSpec {
        FlowSpec {
            bandwidth: self.bandwidth.max(other.bandwidth),
            delay: self.delay.max(other.delay),
        }
    }
}

/// One hop of an explicit route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EroHop {
    /// The router to traverse
    pub node: RouterAddr,
    /// Loose bit: a loose hop lets the local router re-derive the route
    /// from this point via CSPF.
    pub loose: bool,
}

/// PHOP/NHOP object: the neighbor that emitted the message, and the logical
/// interface handle of the interface the reservation applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsvpHop {
    /// Address of the emitting neighbor
    pub neighbor: RouterAddr,
    /// Logical interface handle; `None` when the message was handed over
    /// locally by the application layer.
    pub lih: Option<InterfaceAddr>,
}

/// Reservation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStyle {
    /// Fixed-Filter: each (flowspec, filter) pair is processed
    /// independently.
    FixedFilter,
    /// Shared-Explicit: one flowspec is processed once against the whole
    /// filter list.
    SharedExplicit,
}

/// One flow descriptor of a RESV (or RESV TEAR) message.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDescriptor {
    /// The sender this descriptor reserves for
    pub filter: FilterSpec,
    /// Reserved flowspec
    pub flowspec: FlowSpec,
    /// Label advertised for this sender (downstream-assigned)
    pub label: Option<Label>,
    /// Record route; every hop appends itself when relaying the RESV
    /// upstream (egress first), the ingress reverses once on arrival.
    pub rro: Vec<RouterAddr>,
}

/// Error codes carried by PathErr / ResvErr messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Admission control failed at a transit or ingress hop
    AdmissionFailure,
    /// Reservation failed after exhausting preemption
    ReservationFailure,
}

/// PATH message.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMsg {
    /// Session of the tunnel being signaled
    pub session: SessionObj,
    /// Sender template
    pub sender: SenderTemplate,
    /// Sender Tspec
    pub tspec: FlowSpec,
    /// Previous hop
    pub hop: RsvpHop,
    /// Explicit route (remaining hops, forward order); `None` for
    /// hop-by-hop routing.
    pub ero: Option<Vec<EroHop>>,
    /// Label request marker
    pub label_request: bool,
}

/// RESV message.
#[derive(Debug, Clone, PartialEq)]
pub struct ResvMsg {
    /// Session of the tunnel being reserved
    pub session: SessionObj,
    /// Next hop (the downstream neighbor that emitted this RESV)
    pub hop: RsvpHop,
    /// Reservation style
    pub style: ReservationStyle,
    /// Flow descriptor list (at most [`FLOW_SLOTS`] entries)
    pub flow_descriptors: Vec<FlowDescriptor>,
}

/// PATH TEAR message.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTearMsg {
    /// Session being torn down
    pub session: SessionObj,
    /// Sender whose path state is torn down
    pub sender: SenderTemplate,
}

/// RESV TEAR message.
#[derive(Debug, Clone, PartialEq)]
pub struct ResvTearMsg {
    /// Session being torn down
    pub session: SessionObj,
    /// The downstream neighbor that emitted this tear
    pub hop: RsvpHop,
    /// Flow descriptors being released
    pub flow_descriptors: Vec<FlowDescriptor>,
}

/// PATH ERROR message. Travels towards the sender along the PHOP chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PathErrMsg {
    /// Session the error applies to
    pub session: SessionObj,
    /// Sender the error applies to
    pub sender: SenderTemplate,
    /// Sender Tspec of the failed path
    pub tspec: FlowSpec,
    /// Error code
    pub error_code: ErrorCode,
    /// Router at which the error occurred
    pub error_node: RouterAddr,
}

/// RESV ERROR message. Travels towards the receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResvErrMsg {
    /// Session the error applies to
    pub session: SessionObj,
    /// Error code
    pub error_code: ErrorCode,
    /// Router at which the error occurred
    pub error_node: RouterAddr,
}

/// RSVP-TE message.
#[derive(Debug, Clone, PartialEq)]
pub enum RsvpMessage {
    /// PATH message, downstream
    Path(PathMsg),
    /// RESV message, upstream
    Resv(ResvMsg),
    /// PATH TEAR message, downstream
    PathTear(PathTearMsg),
    /// RESV TEAR message, upstream
    ResvTear(ResvTearMsg),
    /// PATH ERROR message, towards the sender
    PathErr(PathErrMsg),
    /// RESV ERROR message, towards the receiver
    ResvErr(ResvErrMsg),
}

/// LDP message.
#[derive(Debug, Clone, PartialEq)]
pub enum LdpMessage {
    /// Discovery Hello, sent to all neighbors
    Hello,
    /// Request a label binding for the FEC (destination address)
    LabelRequest {
        /// FEC the binding is requested for
        fec: RouterAddr,
    },
    /// Advertise a label binding for the FEC
    LabelMapping {
        /// FEC the binding applies to
        fec: RouterAddr,
        /// The advertised label
        label: Label,
    },
}

/// Modeled transport handshake for the LDP session (stands in for a TCP
/// three-way handshake; no real connection is opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection request from the active side
    Syn,
    /// Acknowledgment from the passive side; the session is established
    SynAck,
}
