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

//! # Static configuration
//!
//! Typed counterparts of the traffic-request list and the LIB
//! pre-provisioning table. Loading these from files is a host concern and
//! stays outside this crate.

use crate::lib_table::{FecId, LabelOpVec};
use crate::messages::EroHop;
use crate::types::{Bandwidth, ConfigError, InterfaceAddr, Label, Metric, RouterAddr};

/// One traffic request: a tunnel the head end should signal.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficRequest {
    /// Source (head-end) router
    pub src: RouterAddr,
    /// Destination (tail-end) router
    pub dest: RouterAddr,
    /// Setup priority (0 = highest)
    pub setup_pri: u8,
    /// Holding priority (0 = highest); must be at least as strong
    /// (numerically at most as large) as the setup priority
    pub holding_pri: u8,
    /// Requested delay
    pub delay: Metric,
    /// Requested bandwidth
    pub bandwidth: Bandwidth,
    /// Signal with an explicit route (administratively given, or computed
    /// via CSPF when `route` is empty); hop-by-hop routing otherwise
    pub explicit_route: bool,
    /// Administratively given hop list (used only with `explicit_route`)
    pub route: Vec<EroHop>,
}

impl TrafficRequest {
    /// Check the priority relation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.holding_pri > self.setup_pri {
            return Err(ConfigError::InvalidPriorities {
                setup: self.setup_pri,
                holding: self.holding_pri,
            });
        }
        Ok(())
    }
}

/// One statically pre-provisioned LIB entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLibEntry {
    /// Router the entry is installed on
    pub router: RouterAddr,
    /// Incoming label; `None` allocates from the router's label space
    pub in_label: Option<Label>,
    /// Incoming interface (`None` for ingress entries)
    pub in_interface: Option<InterfaceAddr>,
    /// Label operation sequence
    pub ops: LabelOpVec,
    /// Outgoing interface (`None` delivers natively)
    pub out_interface: Option<InterfaceAddr>,
    /// FEC tag
    pub fec: FecId,
}

/// Static configuration: traffic requests plus LIB pre-provisioning.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// All traffic requests, in insertion order
    pub requests: Vec<TrafficRequest>,
    /// All static LIB entries, in insertion order
    pub lib_entries: Vec<StaticLibEntry>,
}

impl Config {
    /// New, empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a traffic request, rejecting invalid priorities and duplicate
    /// (source, destination) pairs.
    pub fn add_request(&mut self, request: TrafficRequest) -> Result<(), ConfigError> {
        request.validate()?;
        if self.requests.iter().any(|r| r.src == request.src && r.dest == request.dest) {
            return Err(ConfigError::DuplicateTrafficRequest);
        }
        self.requests.push(request);
        Ok(())
    }

    /// Add a static LIB entry.
    pub fn add_lib_entry(&mut self, entry: StaticLibEntry) {
        self.lib_entries.push(entry);
    }
}
