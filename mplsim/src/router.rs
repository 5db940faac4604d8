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

//! Module defining a label switching router.
//!
//! A router composes the per-router state: the RSVP-TE engine, the LDP
//! engine, the head-end tunnel manager, the label table, and the IGP
//! forwarding table. It dispatches delivered events to the engines and
//! feeds application-layer reactions back into the RSVP engine.

use crate::app::{AppAction, TunnelManager};
use crate::event::{Event, EventQueue};
use crate::ldp::{LdpContext, LdpProcess};
use crate::lib_table::LibTable;
use crate::messages::RsvpMessage;
use crate::rsvp::{AppSignal, RsvpContext, RsvpProcess};
use crate::ted::TedService;
use crate::types::{DeviceError, IgpTable, Metric, RouterAddr, RouterId};
use log::*;
use petgraph::algo::bellman_ford;
use std::collections::HashMap;

/// A label switching router.
#[derive(Debug, Clone)]
pub struct Router {
    /// Name of the router
    name: String,
    /// ID of the router
    router_id: RouterId,
    /// Address of the router
    addr: RouterAddr,
    /// IGP forwarding table
    pub(crate) igp_table: IgpTable,
    /// RSVP-TE engine
    rsvp: RsvpProcess,
    /// LDP engine
    ldp: LdpProcess,
    /// Head-end application layer
    app: TunnelManager,
    /// Label information base
    lib: LibTable,
}

impl Router {
    pub(crate) fn new(name: String, router_id: RouterId, addr: RouterAddr) -> Router {
        Router {
            name,
            router_id,
            addr,
            igp_table: HashMap::new(),
            rsvp: RsvpProcess::new(addr),
            ldp: LdpProcess::new(addr),
            app: TunnelManager::new(addr),
            lib: LibTable::new(),
        }
    }

    /// Return the idx of the Router
    pub fn router_id(&self) -> RouterId {
        self.router_id
    }

    /// Return the name of the Router
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Return the address of the Router
    pub fn addr(&self) -> RouterAddr {
        self.addr
    }

    /// The label information base of this router.
    pub fn lib(&self) -> &LibTable {
        &self.lib
    }

    /// Mutable access to the label table (static pre-provisioning).
    pub(crate) fn lib_mut(&mut self) -> &mut LibTable {
        &mut self.lib
    }

    /// The RSVP-TE engine of this router.
    pub fn rsvp(&self) -> &RsvpProcess {
        &self.rsvp
    }

    /// The LDP engine of this router.
    pub fn ldp(&self) -> &LdpProcess {
        &self.ldp
    }

    /// The tunnel manager of this router.
    pub fn app(&self) -> &TunnelManager {
        &self.app
    }

    /// Returns the IGP Forwarding table. The table maps the address of
    /// every router in the network to a tuple `(next_hop, cost)` of the
    /// next hop on the path and the cost to reach the destination.
    pub fn get_igp_fw_table(&self) -> &IgpTable {
        &self.igp_table
    }

    /// Handle one delivered event, enqueuing any resulting events.
    pub(crate) fn handle_event(
        &mut self,
        event: Event,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        match event {
            Event::Rsvp(from, to, msg) if to == self.addr => {
                let signals = {
                    let mut ctx = RsvpContext {
                        ted,
                        lib: &mut self.lib,
                        igp: &self.igp_table,
                        queue,
                    };
                    self.rsvp.process(from, msg, &mut ctx)?
                };
                self.dispatch_signals(signals, ted, queue)
            }
            Event::Ldp(from, to, msg) if to == self.addr => {
                let snapshot = ted.snapshot();
                let mut ctx = LdpContext {
                    ted: &snapshot,
                    lib: &mut self.lib,
                    igp: &self.igp_table,
                    queue,
                };
                self.ldp.process(from, msg, &mut ctx)
            }
            Event::LdpTransport(from, to, ev) if to == self.addr => {
                let snapshot = ted.snapshot();
                let mut ctx = LdpContext {
                    ted: &snapshot,
                    lib: &mut self.lib,
                    igp: &self.igp_table,
                    queue,
                };
                self.ldp.process_transport(from, ev, &mut ctx);
                Ok(())
            }
            e => {
                debug!("{}: event not addressed to this router, ignoring: {:?}", self.addr, e);
                Ok(())
            }
        }
    }

    /// Feed application signals into the tunnel manager, and its reactions
    /// back into the RSVP engine, until both are quiet.
    fn dispatch_signals(
        &mut self,
        signals: Vec<AppSignal>,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        let mut worklist = signals;
        while !worklist.is_empty() {
            let mut actions = Vec::new();
            for signal in worklist.drain(..) {
                match signal {
                    AppSignal::ResvArrived(msg) => actions.extend(self.app.resv_arrived(&msg)),
                    AppSignal::PathErrArrived(msg) => {
                        actions.extend(self.app.path_err_arrived(&msg))
                    }
                    AppSignal::ResvTearArrived(msg) => self.app.resv_tear_arrived(&msg),
                    AppSignal::PathTearArrived(_) => {
                        trace!("{}: tail end observed a path teardown", self.addr)
                    }
                }
            }
            for action in actions {
                worklist.extend(self.dispatch_action(action, ted, queue)?);
            }
        }
        Ok(())
    }

    /// Hand one application-layer message to the local RSVP engine.
    fn dispatch_action(
        &mut self,
        action: AppAction,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let msg = match action {
            AppAction::SendPath(m) => RsvpMessage::Path(m),
            AppAction::SendPathTear(m) => RsvpMessage::PathTear(m),
        };
        let mut ctx = RsvpContext { ted, lib: &mut self.lib, igp: &self.igp_table, queue };
        self.rsvp.process(self.addr, msg, &mut ctx)
    }

    /// Register a traffic request with the tunnel manager.
    pub(crate) fn add_traffic_request(&mut self, request: crate::config::TrafficRequest) {
        self.app.add_traffic_request(request);
    }

    /// Signal the tunnel towards `dest` (head-end operation).
    pub(crate) fn path_request(
        &mut self,
        dest: RouterAddr,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        let actions = self.app.path_request(dest, &ted.snapshot());
        self.run_actions(actions, ted, queue)
    }

    /// Tear the tunnel towards `dest` down (head-end operation).
    pub(crate) fn teardown_request(
        &mut self,
        dest: RouterAddr,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        let actions = self.app.teardown_request(dest);
        self.run_actions(actions, ted, queue)
    }

    /// Operator command: change the bandwidth of the tunnel towards
    /// `dest`.
    pub(crate) fn new_bandwidth_request(
        &mut self,
        dest: RouterAddr,
        bandwidth: f64,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        let actions = self.app.new_bandwidth_request(dest, bandwidth, &ted.snapshot());
        self.run_actions(actions, ted, queue)
    }

    /// Operator command: look for better routes for the recorded LSPs.
    pub(crate) fn new_route_discover(
        &mut self,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        let actions = self.app.new_route_discover(&ted.snapshot());
        self.run_actions(actions, ted, queue)
    }

    /// One LDP discovery round.
    pub(crate) fn ldp_start_discovery(&mut self, ted: &TedService, queue: &mut EventQueue) {
        let snapshot = ted.snapshot();
        let mut ctx =
            LdpContext { ted: &snapshot, lib: &mut self.lib, igp: &self.igp_table, queue };
        self.ldp.start_discovery(&mut ctx);
    }

    /// Request a label binding for a FEC over LDP.
    pub(crate) fn ldp_request_label(
        &mut self,
        fec: RouterAddr,
        ted: &TedService,
        queue: &mut EventQueue,
    ) {
        let snapshot = ted.snapshot();
        let mut ctx =
            LdpContext { ted: &snapshot, lib: &mut self.lib, igp: &self.igp_table, queue };
        self.ldp.request_label(fec, &mut ctx);
    }

    fn run_actions(
        &mut self,
        actions: Vec<AppAction>,
        ted: &mut TedService,
        queue: &mut EventQueue,
    ) -> Result<(), DeviceError> {
        for action in actions {
            let signals = self.dispatch_action(action, ted, queue)?;
            self.dispatch_signals(signals, ted, queue)?;
        }
        Ok(())
    }

    /// Write the IGP forwarding table based on the graph. This requires
    /// that all router ids are set to the graph id.
    pub(crate) fn write_igp_forwarding_table(
        &mut self,
        graph: &crate::types::IgpNetwork,
        addrs: &HashMap<RouterId, RouterAddr>,
    ) {
        // clear the forwarding table
        self.igp_table = HashMap::new();
        // compute shortest path to all other nodes in the graph
        let (path_weights, predecessors) = match bellman_ford(graph, self.router_id) {
            Ok(r) => r,
            Err(_) => return,
        };
        let mut paths: Vec<(RouterId, Metric, Option<RouterId>)> = path_weights
            .into_iter()
            .zip(predecessors.into_iter())
            .enumerate()
            .map(|(i, (w, p))| ((i as u32).into(), w, p))
            .collect();
        paths.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        let mut table: HashMap<RouterId, Option<(RouterId, Metric)>> = HashMap::new();
        for (router, cost, predecessor) in paths {
            if cost.is_infinite() {
                table.insert(router, None);
                continue;
            }
            let next_hop = if let Some(predecessor) = predecessor {
                // the predecessor is already in the table, because the
                // entries are sorted by distance
                if predecessor == self.router_id {
                    router
                } else {
                    match table.get(&predecessor).copied().flatten() {
                        Some((nh, _)) => nh,
                        None => router,
                    }
                }
            } else {
                router
            };
            table.insert(router, Some((next_hop, cost)));
        }
        // translate the graph ids into router addresses
        for (router, entry) in table {
            let dest = match addrs.get(&router) {
                Some(a) => *a,
                None => continue,
            };
            let entry = entry.and_then(|(nh, cost)| addrs.get(&nh).map(|a| (*a, cost)));
            self.igp_table.insert(dest, entry);
        }
    }
}
