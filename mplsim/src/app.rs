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

//! # Head-end application layer
//!
//! Tunnel bookkeeping at the ingress: translating traffic requests into
//! PATH messages, recording the routes the RESVs report back, and driving
//! the two operator commands (bandwidth change and route re-discovery)
//! with the doubled-LSP-id make-before-break convention.

use crate::config::TrafficRequest;
use crate::cspf;
use crate::messages::{
    EroHop, FlowSpec, PathErrMsg, PathMsg, PathTearMsg, ResvMsg, ResvTearMsg, RsvpHop,
    SenderTemplate, SessionObj,
};
use crate::ted::Ted;
use crate::types::{LspId, Metric, RouterAddr};
use itertools::Itertools;
use log::*;

/// Default source port for sender templates.
pub const DEFAULT_SRC_PORT: u16 = 1000;
/// Default destination port for sessions.
pub const DEFAULT_DEST_PORT: u16 = 7000;

/// RSVP messages the application layer hands to its local RSVP engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Signal a PATH for a new or re-routed LSP
    SendPath(PathMsg),
    /// Tear an LSP down
    SendPathTear(PathTearMsg),
}

/// One tunnel the head end is responsible for.
#[derive(Debug, Clone, PartialEq)]
pub struct LspTunnel {
    /// Session of the tunnel
    pub session: SessionObj,
    /// Sender template (the primary LSP id)
    pub sender: SenderTemplate,
    /// True once a RESV confirmed the LSP
    pub operating: bool,
}

/// The route one LSP currently uses, in forward order (this router first).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    /// LSP id the route belongs to
    pub lsp_id: LspId,
    /// The recorded hops
    pub route: Vec<RouterAddr>,
}

/// Tunnel manager of one head-end router.
#[derive(Debug, Clone)]
pub struct TunnelManager {
    router: RouterAddr,
    traffic: Vec<TrafficRequest>,
    tunnels: Vec<LspTunnel>,
    routes: Vec<RouteRecord>,
    next_lsp: u32,
}

impl TunnelManager {
    /// New manager for the router with the given address.
    pub fn new(router: RouterAddr) -> Self {
        Self { router, traffic: Vec::new(), tunnels: Vec::new(), routes: Vec::new(), next_lsp: 1 }
    }

    /// Register a traffic request (validated by the caller).
    pub fn add_traffic_request(&mut self, request: TrafficRequest) {
        self.traffic.push(request);
    }

    /// Registered tunnels (for inspection).
    pub fn tunnels(&self) -> &[LspTunnel] {
        &self.tunnels
    }

    /// Recorded routes (for inspection).
    pub fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    /// The recorded route of the given LSP.
    pub fn route_of(&self, lsp_id: LspId) -> Option<&RouteRecord> {
        self.routes.iter().find(|r| r.lsp_id == lsp_id)
    }

    /// Signal the tunnel towards `dest`. A repeated request for an already
    /// known (source, destination) pair is silently ignored.
    pub fn path_request(&mut self, dest: RouterAddr, ted: &Ted) -> Vec<AppAction> {
        if self.tunnels.iter().any(|t| t.session.dest == dest && t.sender.src == self.router) {
            debug!("{}: tunnel towards {} already requested", self.router, dest);
            return Vec::new();
        }
        let request = match self.traffic.iter().find(|r| r.dest == dest).cloned() {
            Some(r) => r,
            None => {
                // no traffic spec: signal with an empty reservation at the
                // weakest priority
                TrafficRequest {
                    src: self.router,
                    dest,
                    setup_pri: 7,
                    holding_pri: 7,
                    delay: 0.0,
                    bandwidth: 0.0,
                    explicit_route: false,
                    route: Vec::new(),
                }
            }
        };
        let tunnel_id = self.tunnels.iter().map(|t| t.session.tunnel_id + 1).max().unwrap_or(1);
        let ext_tunnel_id =
            self.tunnels.iter().map(|t| t.session.ext_tunnel_id + 1).max().unwrap_or(1);
        let lsp_id = LspId(self.next_lsp);
        self.next_lsp += 1;
        let session = SessionObj {
            dest,
            protocol_id: 1,
            dest_port: DEFAULT_DEST_PORT,
            setup_pri: request.setup_pri,
            holding_pri: request.holding_pri,
            tunnel_id,
            ext_tunnel_id,
        };
        let sender = SenderTemplate { src: self.router, src_port: DEFAULT_SRC_PORT, lsp_id };
        self.tunnels.push(LspTunnel { session, sender, operating: false });
        match self.build_path_msg(&session, &request, lsp_id, ted) {
            Some(msg) => vec![AppAction::SendPath(msg)],
            None => Vec::new(),
        }
    }

    /// Tear the tunnel towards `dest` down.
    pub fn teardown_request(&mut self, dest: RouterAddr) -> Vec<AppAction> {
        let router = self.router;
        let tunnel = match self
            .tunnels
            .iter_mut()
            .find(|t| t.session.dest == dest && t.sender.src == router)
        {
            Some(t) => t,
            None => {
                debug!("{}: no tunnel towards {} to tear down", self.router, dest);
                return Vec::new();
            }
        };
        tunnel.operating = false;
        vec![AppAction::SendPathTear(PathTearMsg {
            session: tunnel.session,
            sender: tunnel.sender,
        })]
    }

    /// Build the PATH message for a (re-)signaling attempt. With the
    /// explicit-route flag, the administratively given hop list wins; an
    /// empty list asks CSPF. No feasible constrained route drops the
    /// request with a log entry.
    fn build_path_msg(
        &self,
        session: &SessionObj,
        request: &TrafficRequest,
        lsp_id: LspId,
        ted: &Ted,
    ) -> Option<PathMsg> {
        let tspec = FlowSpec::new(request.bandwidth, request.delay);
        let ero = if request.explicit_route {
            if request.route.is_empty() {
                debug!(
                    "{}: CSPF path computation towards {} for lsp {}",
                    self.router, session.dest, lsp_id
                );
                match cspf::compute_ero(ted, self.router, session.dest, &tspec, session.setup_pri) {
                    Some(path) => {
                        Some(path.hops.iter().map(|n| EroHop { node: *n, loose: false }).collect())
                    }
                    None => {
                        info!(
                            "{}: no resource available towards {}, dropping request",
                            self.router, session.dest
                        );
                        return None;
                    }
                }
            } else {
                Some(request.route.clone())
            }
        } else {
            None
        };
        Some(PathMsg {
            session: *session,
            sender: SenderTemplate { src: self.router, src_port: DEFAULT_SRC_PORT, lsp_id },
            tspec,
            hop: RsvpHop { neighbor: self.router, lih: None },
            ero,
            label_request: true,
        })
    }

    /// A RESV reached this head end: record the route, mark the tunnel
    /// operating, and complete a make-before-break reroute by tearing the
    /// previous LSP instance down.
    pub fn resv_arrived(&mut self, msg: &ResvMsg) -> Vec<AppAction> {
        let mut actions = Vec::new();
        for fd in &msg.flow_descriptors {
            let lsp_id = fd.filter.lsp_id;
            let tunnel = match self.tunnels.iter_mut().find(|t| {
                t.sender.src == fd.filter.src
                    && (t.sender.lsp_id == lsp_id || t.sender.lsp_id == lsp_id.reroute_twin())
            }) {
                Some(t) => t,
                None => continue,
            };
            if tunnel.operating && !lsp_id.is_reroute() {
                continue;
            }
            // replace the recorded route of both LSP instances
            self.routes.retain(|r| r.lsp_id != lsp_id && r.lsp_id != lsp_id.reroute_twin());
            let mut route = vec![self.router];
            route.extend(fd.rro.iter().rev());
            info!("{}: LSP {} towards {} is up, route {:?}", self.router, lsp_id, msg.session.dest, route);
            self.routes.push(RouteRecord { lsp_id, route });
            tunnel.operating = true;

            if lsp_id.is_reroute() {
                // make-before-break: the new instance is up, tear the old
                // one down
                let old = SenderTemplate {
                    src: fd.filter.src,
                    src_port: fd.filter.src_port,
                    lsp_id: lsp_id.reroute_twin(),
                };
                debug!("{}: reroute complete, tearing down lsp {}", self.router, old.lsp_id);
                actions.push(AppAction::SendPathTear(PathTearMsg {
                    session: msg.session,
                    sender: old,
                }));
            }
        }
        actions
    }

    /// A PATH ERROR reached this head end: give the failed LSP up.
    pub fn path_err_arrived(&mut self, msg: &PathErrMsg) -> Vec<AppAction> {
        warn!(
            "{}: PATH ERROR ({:?}) at node {} for lsp {}",
            self.router, msg.error_code, msg.error_node, msg.sender.lsp_id
        );
        if let Some(t) = self.tunnels.iter_mut().find(|t| t.sender == msg.sender) {
            t.operating = false;
        }
        vec![AppAction::SendPathTear(PathTearMsg { session: msg.session, sender: msg.sender })]
    }

    /// A RESV TEAR reached this head end: the LSP is gone.
    pub fn resv_tear_arrived(&mut self, msg: &ResvTearMsg) {
        for fd in &msg.flow_descriptors {
            info!("{}: lsp {} was torn down", self.router, fd.filter.lsp_id);
            if let Some(t) = self.tunnels.iter_mut().find(|t| {
                t.sender.src == fd.filter.src && t.sender.lsp_id == fd.filter.lsp_id.primary()
            }) {
                t.operating = false;
            }
            self.routes.retain(|r| r.lsp_id != fd.filter.lsp_id);
        }
    }

    /// Operator command: change the bandwidth of the tunnel towards
    /// `dest`. Re-signals a PATH under the doubled LSP id. An unknown
    /// tunnel is silently ignored.
    pub fn new_bandwidth_request(
        &mut self,
        dest: RouterAddr,
        bandwidth: f64,
        ted: &Ted,
    ) -> Vec<AppAction> {
        let request = match self.traffic.iter_mut().find(|r| r.dest == dest) {
            Some(r) => {
                r.bandwidth = bandwidth;
                info!("{}: new bandwidth request towards {}: {}", self.router, dest, bandwidth);
                r.clone()
            }
            None => {
                debug!("{}: no traffic request towards {}, ignoring", self.router, dest);
                return Vec::new();
            }
        };
        let (session, lsp_id) = match self
            .tunnels
            .iter()
            .find(|t| t.session.dest == dest && t.sender.src == self.router)
        {
            Some(t) => (t.session, t.sender.lsp_id.reroute_twin()),
            None => {
                debug!("{}: no tunnel towards {}, ignoring", self.router, dest);
                return Vec::new();
            }
        };
        match self.build_path_msg(&session, &request, lsp_id, ted) {
            Some(msg) => vec![AppAction::SendPath(msg)],
            None => Vec::new(),
        }
    }

    /// Operator command: re-run CSPF against every recorded route and
    /// re-signal (under the doubled LSP id) where a strictly better route
    /// exists with sufficient bandwidth.
    pub fn new_route_discover(&mut self, ted: &Ted) -> Vec<AppAction> {
        let mut actions = Vec::new();
        for record in self.routes.clone() {
            debug!("{}: CSPF re-computation for lsp {}", self.router, record.lsp_id);
            let tunnel = match self.tunnels.iter().find(|t| {
                t.sender.lsp_id == record.lsp_id
                    || t.sender.lsp_id == record.lsp_id.reroute_twin()
            }) {
                Some(t) => t.clone(),
                None => continue,
            };
            let request = match self.traffic.iter().find(|r| r.dest == tunnel.session.dest) {
                Some(r) => r.clone(),
                None => {
                    debug!("{}: no traffic spec for lsp {}", self.router, record.lsp_id);
                    continue;
                }
            };
            let flowspec = FlowSpec::new(request.bandwidth, request.delay);

            // the links the LSP currently occupies, and their total metric
            let links_in_use: Vec<cspf::LinkKey> =
                record.route.iter().copied().tuple_windows().collect();
            let current_metric: Metric = links_in_use
                .iter()
                .filter_map(|(a, b)| ted.link(*a, *b).map(|l| l.metric))
                .sum();

            let path = match cspf::compute_ero_reopt(
                ted,
                self.router,
                tunnel.session.dest,
                &links_in_use,
                &flowspec,
                &flowspec,
                tunnel.session.setup_pri,
            ) {
                Some(p) => p,
                None => continue,
            };
            if path.metric >= current_metric {
                debug!(
                    "{}: no better route for lsp {} (new {} >= current {})",
                    self.router, record.lsp_id, path.metric, current_metric
                );
                continue;
            }
            if path.hops == record.route[1..] {
                continue;
            }
            info!(
                "{}: better route for lsp {} found (metric {} < {}), re-signaling",
                self.router, record.lsp_id, path.metric, current_metric
            );
            let new_lsp = record.lsp_id.reroute_twin();
            let msg = PathMsg {
                session: tunnel.session,
                sender: SenderTemplate {
                    src: self.router,
                    src_port: DEFAULT_SRC_PORT,
                    lsp_id: new_lsp,
                },
                tspec: flowspec,
                hop: RsvpHop { neighbor: self.router, lih: None },
                ero: Some(path.hops.iter().map(|n| EroHop { node: *n, loose: false }).collect()),
                label_request: true,
            };
            actions.push(AppAction::SendPath(msg));
        }
        actions
    }
}
