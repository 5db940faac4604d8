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

//! Module containing all type definitions

use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use thiserror::Error;

type IndexType = u32;
/// Router Identification (and index into the graph)
pub type RouterId = NodeIndex<IndexType>;
/// Link metric, used as propagation delay
pub type Metric = f64;
/// Bandwidth (simulation units, no dimension attached)
pub type Bandwidth = f64;
/// MPLS label (router-local label space)
pub type Label = u32;
/// IGP Network graph, edge weights are the link metrics
pub type IgpNetwork = StableGraph<(), Metric, Directed, IndexType>;
/// IGP forwarding table: destination address to `(next hop, cost)`, or
/// `None` when the destination is unreachable
pub type IgpTable = std::collections::HashMap<RouterAddr, Option<(RouterAddr, Metric)>>;

/// Number of preemption priority levels. Priority 0 is the highest.
pub const PRIORITY_LEVELS: usize = 8;

/// Largest primary LSP id. Reroute instances of an LSP use the id
/// `2 * MAX_LSP_NO - id`, so that an in-flight reroute never collides with
/// the primary instance of the same tunnel.
pub const MAX_LSP_NO: u32 = 1000;

/// Router address (used as router id on the wire, and for the LDP role
/// tie-break). Addresses are allocated as 10.0.0.1, 10.0.0.2, ... in the
/// order routers are added to the network.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct RouterAddr(pub u32);

impl std::fmt::Display for RouterAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.0 >> 24,
            (self.0 >> 16) & 0xff,
            (self.0 >> 8) & 0xff,
            self.0 & 0xff
        )
    }
}

impl RouterAddr {
    /// Address of the n-th router added to the network (starting at 0).
    pub fn nth(n: usize) -> Self {
        RouterAddr(0x0a00_0001 + n as u32)
    }
}

/// Interface address. Interfaces are identified by their addresses, both in
/// the TED and in the LIB.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct InterfaceAddr(pub u32);

impl std::fmt::Display for InterfaceAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.0 >> 24,
            (self.0 >> 16) & 0xff,
            (self.0 >> 8) & 0xff,
            self.0 & 0xff
        )
    }
}

/// LSP identifier, with the reroute-twin transform.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct LspId(pub u32);

impl LspId {
    /// The id used by the reroute (make-before-break) instance of this LSP.
    /// The transform is its own inverse.
    pub fn reroute_twin(self) -> LspId {
        LspId(2 * MAX_LSP_NO - self.0)
    }

    /// Returns true if this id denotes a reroute instance.
    pub fn is_reroute(self) -> bool {
        self.0 > MAX_LSP_NO
    }

    /// The primary id of this LSP, whether `self` is the primary or the
    /// reroute instance.
    pub fn primary(self) -> LspId {
        if self.is_reroute() {
            self.reroute_twin()
        } else {
            self
        }
    }
}

impl std::fmt::Display for LspId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration Error
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// Holding priority must be at least as strong (numerically at most as
    /// large) as the setup priority.
    #[error("Holding priority {holding} is weaker than setup priority {setup}")]
    InvalidPriorities {
        /// setup priority of the offending request
        setup: u8,
        /// holding priority of the offending request
        holding: u8,
    },
    /// A traffic request for the same (source, destination) pair exists
    #[error("A traffic request for this source and destination already exists")]
    DuplicateTrafficRequest,
}

/// Protocol engine errors. These are local invariant violations: they abort
/// processing of the current event, but are never reported to peers
/// (protocol-level failures travel as PathErr / ResvErr messages instead).
#[derive(Error, Debug, PartialEq)]
pub enum DeviceError {
    /// A RESV arrived, but no path state exists for the session at all.
    #[error("No path state block exists for the session")]
    NoPathInformation,
    /// Sessions with the same destination must agree on the destination port.
    #[error("Conflicting destination port within the same session")]
    ConflictingDestPort,
    /// Two senders with the same source host disagree on the source port.
    #[error("Ambiguous sender port within the same session")]
    AmbiguousSenderPort,
    /// A message presupposes a PSB which does not exist.
    #[error("No matching path state block found")]
    NoMatchingPsb,
    /// No TED entry advertised by this router for the given interface.
    #[error("No TED entry for interface {0} on this router")]
    LinkNotFound(InterfaceAddr),
    /// A label removal or update referenced an unknown label.
    #[error("Label {0} not found in the LIB")]
    LabelNotFound(Label),
    /// A FlowTable modification referenced an unknown reservation handle.
    #[error("No FlowTable entry for handle {0}")]
    NoFlowTableEntry(u32),
    /// No route towards the given destination.
    #[error("No route towards {0}")]
    NoRouteToDestination(RouterAddr),
    /// The fixed filter-slot array of an RSB is full.
    #[error("All filter slots of the reservation state block are in use")]
    FilterSlotsExhausted,
}

/// Network Errors
#[derive(Error, Debug, PartialEq)]
pub enum NetworkError {
    /// Device Error which cannot be handled
    #[error("Device Error: {0}")]
    DeviceError(#[from] DeviceError),
    /// Configuration error
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),
    /// Device is not present in the topology
    #[error("Network device was not found in topology: {0:?}")]
    DeviceNotFound(RouterId),
    /// Device name is not present in the topology
    #[error("Network device name was not found in topology: {0}")]
    DeviceNameNotFound(String),
    /// Device address is not present in the topology
    #[error("Network device address was not found in topology: {0}")]
    DeviceAddrNotFound(RouterAddr),
    /// The event queue did not drain within the message limit
    #[error("Network cannot converge in the given time!")]
    NoConvergence,
}
