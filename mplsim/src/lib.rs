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

#![deny(missing_docs)]

//! # MplsSim: Simulating MPLS Traffic-Engineering Signaling
//!
//! This is a library for simulating MPLS traffic-engineering signaling
//! (RSVP-TE and LDP) together with constrained path computation (CSPF) on
//! arbitrary router topologies.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`Network`](network::Network)**: The simulation host. It owns the
//!   topology graph, all routers, the authoritative
//!   [Traffic Engineering Database](ted::TedService) and the single FIFO
//!   event queue. Every public operation enqueues signaling events and runs
//!   the network until the signaling has converged.
//!
//! - **[`Router`](router::Router)**: One label switching router, composing
//!   the [RSVP-TE engine](rsvp::RsvpProcess), the
//!   [LDP engine](ldp::LdpProcess), the
//!   [head-end tunnel manager](app::TunnelManager), the
//!   [label table](lib_table::LibTable) and the IGP forwarding table.
//!
//! - **[`ted`]**: The Traffic Engineering Database, one record per directed
//!   link with static capacity and per-priority unreserved bandwidth.
//!
//! - **[`cspf`]**: Constrained shortest path computation over a TED
//!   snapshot, used by head ends and by loose explicit-route hops.
//!
//! - **[`rsvp`]**: The RSVP-TE protocol engine with its soft state (path,
//!   reservation and traffic-control state blocks), admission control, and
//!   reservation with preemption.
//!
//! - **[`ldp`]**: The LDP engine: peer discovery, per-peer session setup
//!   with a deterministic connect-role tie-break, and Label Request /
//!   Label Mapping exchange along IGP routes.
//!
//! ## Usage
//!
//! Build the topology, register the traffic requests, and request tunnels:
//!
//! ```
//! use mplsim::config::{Config, TrafficRequest};
//! use mplsim::network::Network;
//! use mplsim::types::NetworkError;
//!
//! fn main() -> Result<(), NetworkError> {
//!     let mut net = Network::new();
//!     let r1 = net.add_router("R1");
//!     let r2 = net.add_router("R2");
//!     let r3 = net.add_router("R3");
//!     let r4 = net.add_router("R4");
//!     net.add_link(r1, r2, 1000.0, 1.0);
//!     net.add_link(r2, r3, 1000.0, 1.0);
//!     net.add_link(r3, r4, 1000.0, 1.0);
//!     net.build_topology()?;
//!
//!     let mut c = Config::new();
//!     c.add_request(TrafficRequest {
//!         src: net.addr_of(r1)?,
//!         dest: net.addr_of(r4)?,
//!         setup_pri: 7,
//!         holding_pri: 7,
//!         delay: 0.0,
//!         bandwidth: 100.0,
//!         explicit_route: true,
//!         route: Vec::new(),
//!     })?;
//!     net.set_config(&c)?;
//!
//!     // signal the tunnel and run the network until convergence
//!     net.request_tunnel(net.addr_of(r1)?, net.addr_of(r4)?)?;
//!
//!     // the ingress now holds a PUSH entry for the new LSP
//!     assert_eq!(net.get_router(r1)?.lib().entries().len(), 1);
//!     Ok(())
//! }
//! ```

// test modules
mod test;

pub mod app;
pub mod arena;
pub mod config;
pub mod cspf;
mod event;
pub mod ldp;
pub mod lib_table;
pub mod messages;
pub mod network;
pub mod router;
pub mod rsvp;
pub mod ted;
pub mod types;

pub use event::{Event, EventQueue};
pub use network::Network;
pub use router::Router;
pub use types::{
    Bandwidth, ConfigError, DeviceError, Label, LspId, Metric, NetworkError, RouterAddr, RouterId,
};
