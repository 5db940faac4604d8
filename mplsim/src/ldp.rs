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

//! # LDP engine
//!
//! Hop-by-hop label distribution: peer discovery over Hellos, a modeled
//! transport handshake per peer pair, and Label Request / Label Mapping
//! exchange installing LIB entries along the IGP route of a FEC.
//!
//! Exactly one session is opened per peer pair: the router with the
//! numerically larger address takes the active (connecting) role,
//! regardless of which side discovers the other first.

use crate::event::{Event, EventQueue};
use crate::lib_table::{pop_label, push_label, swap_label, LibTable};
use crate::messages::{LdpMessage, TransportEvent};
use crate::ted::Ted;
use crate::types::{DeviceError, IgpTable, InterfaceAddr, RouterAddr};
use log::*;

/// Connection state of one LDP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdpSessionState {
    /// Passive side, waiting for the peer to connect
    AwaitingSyn,
    /// Active side, connection request sent
    AwaitingEstab,
    /// Session established, label exchange possible
    Operational,
}

/// One discovered peer.
#[derive(Debug, Clone)]
pub struct LdpPeer {
    /// Peer router address
    pub addr: RouterAddr,
    /// Local interface towards the peer
    pub interface: InterfaceAddr,
    /// True when this router takes the connecting role
    pub active_role: bool,
    /// Session state
    pub state: LdpSessionState,
}

/// Who asked for a label binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requester {
    /// An upstream peer sent a Label Request
    Peer(RouterAddr),
    /// The binding was requested locally (this router is the ingress)
    Local,
}

/// A request forwarded downstream, waiting for the mapping.
#[derive(Debug, Clone)]
struct PendingRequest {
    fec: RouterAddr,
    requester: Requester,
}

/// Collaborators of the LDP engine for one message-handling turn.
pub struct LdpContext<'a> {
    /// TED snapshot for neighbor and interface lookups
    pub ted: &'a Ted,
    /// This router's label information base
    pub lib: &'a mut LibTable,
    /// This router's IGP forwarding table
    pub igp: &'a IgpTable,
    /// The global event queue
    pub queue: &'a mut EventQueue,
}

/// The LDP engine of one router.
#[derive(Debug, Clone)]
pub struct LdpProcess {
    router: RouterAddr,
    peers: Vec<LdpPeer>,
    pending: Vec<PendingRequest>,
}

impl LdpProcess {
    /// New engine for the router with the given address.
    pub fn new(router: RouterAddr) -> Self {
        Self { router, peers: Vec::new(), pending: Vec::new() }
    }

    /// Discovered peers (for inspection).
    pub fn peers(&self) -> &[LdpPeer] {
        &self.peers
    }

    /// The peer entry for the given address.
    pub fn peer(&self, addr: RouterAddr) -> Option<&LdpPeer> {
        self.peers.iter().find(|p| p.addr == addr)
    }

    /// One discovery round: send a Hello to every TED neighbor.
    pub fn start_discovery(&mut self, ctx: &mut LdpContext) {
        for neighbor in ctx.ted.neighbors(self.router) {
            trace!("{}: sending LDP Hello to {}", self.router, neighbor);
            ctx.queue.push_back(Event::Ldp(self.router, neighbor, LdpMessage::Hello));
        }
    }

    /// Handle one delivered LDP message.
    pub fn process(
        &mut self,
        from: RouterAddr,
        msg: LdpMessage,
        ctx: &mut LdpContext,
    ) -> Result<(), DeviceError> {
        match msg {
            LdpMessage::Hello => self.process_hello(from, ctx),
            LdpMessage::LabelRequest { fec } => self.process_label_request(from, fec, ctx),
            LdpMessage::LabelMapping { fec, label } => {
                self.process_label_mapping(from, fec, label, ctx)
            }
        }
    }

    /// Handle one transport handshake event.
    pub fn process_transport(
        &mut self,
        from: RouterAddr,
        event: TransportEvent,
        ctx: &mut LdpContext,
    ) {
        let router = self.router;
        let peer = match self.peers.iter_mut().find(|p| p.addr == from) {
            Some(p) => p,
            None => {
                // nothing known about this guy: refuse
                debug!("{}: transport event from unknown peer {}, ignoring", router, from);
                return;
            }
        };
        match (event, peer.state, peer.active_role) {
            (TransportEvent::Syn, LdpSessionState::AwaitingSyn, false) => {
                peer.state = LdpSessionState::Operational;
                debug!("{}: session with {} established (passive)", router, from);
                ctx.queue.push_back(Event::LdpTransport(router, from, TransportEvent::SynAck));
            }
            (TransportEvent::SynAck, LdpSessionState::AwaitingEstab, true) => {
                peer.state = LdpSessionState::Operational;
                debug!("{}: session with {} established (active)", router, from);
            }
            _ => {
                trace!("{}: dropping unexpected transport event from {}", router, from);
            }
        }
    }

    fn process_hello(&mut self, from: RouterAddr, ctx: &mut LdpContext) -> Result<(), DeviceError> {
        if from == self.router {
            // we are in the all-routers group as well
            return Ok(());
        }
        if self.peers.iter().any(|p| p.addr == from) {
            trace!("{}: {} already in the peer table", self.router, from);
            return Ok(());
        }
        let interface = ctx
            .ted
            .local_interface(self.router, from)
            .ok_or(DeviceError::NoRouteToDestination(from))?;
        // deterministic role assignment: the larger address connects
        let active_role = self.router > from;
        info!(
            "{}: discovered LDP peer {}, we take the {} role",
            self.router,
            from,
            if active_role { "ACTIVE" } else { "PASSIVE" }
        );
        self.peers.push(LdpPeer {
            addr: from,
            interface,
            active_role,
            state: if active_role {
                LdpSessionState::AwaitingEstab
            } else {
                LdpSessionState::AwaitingSyn
            },
        });
        // introduce ourselves, then connect if we are the active side
        ctx.queue.push_back(Event::Ldp(self.router, from, LdpMessage::Hello));
        if active_role {
            ctx.queue.push_back(Event::LdpTransport(self.router, from, TransportEvent::Syn));
        }
        Ok(())
    }

    /// The operational peer on the IGP route towards the FEC.
    fn downstream_peer(&self, fec: RouterAddr, igp: &IgpTable) -> Option<RouterAddr> {
        let next_hop = igp.get(&fec).and_then(|e| *e).map(|(nh, _)| nh)?;
        self.peers
            .iter()
            .find(|p| p.addr == next_hop && p.state == LdpSessionState::Operational)
            .map(|p| p.addr)
    }

    /// Locally request a binding for a FEC (this router becomes the
    /// ingress of the resulting LSP).
    pub fn request_label(&mut self, fec: RouterAddr, ctx: &mut LdpContext) {
        if fec == self.router {
            return;
        }
        if self.pending.iter().any(|p| p.fec == fec && p.requester == Requester::Local) {
            trace!("{}: request for {} already pending", self.router, fec);
            return;
        }
        match self.downstream_peer(fec, ctx.igp) {
            Some(peer) => {
                self.pending.push(PendingRequest { fec, requester: Requester::Local });
                debug!("{}: requesting label for {} from {}", self.router, fec, peer);
                ctx.queue.push_back(Event::Ldp(self.router, peer, LdpMessage::LabelRequest { fec }));
            }
            None => warn!("{}: no operational LDP peer towards {}", self.router, fec),
        }
    }

    fn process_label_request(
        &mut self,
        from: RouterAddr,
        fec: RouterAddr,
        ctx: &mut LdpContext,
    ) -> Result<(), DeviceError> {
        debug!("{}: Label Request from {} for FEC {}", self.router, from, fec);
        let in_interface = ctx
            .ted
            .local_interface(self.router, from)
            .ok_or(DeviceError::NoRouteToDestination(from))?;

        if fec == self.router {
            // we are the egress, answer right away
            let label = ctx.lib.install(None, Some(in_interface), pop_label(), None, fec.0);
            info!("{}: egress for FEC {}, installed POP entry with label {}", self.router, fec, label);
            ctx.queue
                .push_back(Event::Ldp(self.router, from, LdpMessage::LabelMapping { fec, label }));
            return Ok(());
        }

        // do we already have a mapping from downstream?
        let downstream = self.downstream_peer(fec, ctx.igp);
        let known = downstream.and_then(|peer| {
            let out_interface = ctx.ted.local_interface(self.router, peer)?;
            ctx.lib
                .entries()
                .iter()
                .find(|e| e.fec == fec.0 && e.out_interface == Some(out_interface))
                .and_then(|e| match e.ops.first() {
                    Some(crate::lib_table::LabelOp::Swap(l)) => Some((*l, out_interface)),
                    Some(crate::lib_table::LabelOp::Push(l)) => Some((*l, out_interface)),
                    _ => None,
                })
        });
        if let Some((downstream_label, out_interface)) = known {
            let label = ctx.lib.install(
                None,
                Some(in_interface),
                swap_label(downstream_label),
                Some(out_interface),
                fec.0,
            );
            info!(
                "{}: answered Label Request for {} from known mapping, in label {}",
                self.router, fec, label
            );
            ctx.queue
                .push_back(Event::Ldp(self.router, from, LdpMessage::LabelMapping { fec, label }));
            return Ok(());
        }

        // no mapping from downstream: mark as pending and forward the
        // request; a duplicate pending request is silently ignored
        if self.pending.iter().any(|p| p.fec == fec && p.requester == Requester::Peer(from)) {
            debug!("{}: duplicate Label Request for {} from {}, ignoring", self.router, fec, from);
            return Ok(());
        }
        match self.downstream_peer(fec, ctx.igp) {
            Some(peer) => {
                self.pending.push(PendingRequest { fec, requester: Requester::Peer(from) });
                debug!("{}: forwarding Label Request for {} to {}", self.router, fec, peer);
                ctx.queue.push_back(Event::Ldp(self.router, peer, LdpMessage::LabelRequest { fec }));
            }
            None => {
                warn!("{}: no route towards FEC {}, dropping Label Request", self.router, fec);
            }
        }
        Ok(())
    }

    fn process_label_mapping(
        &mut self,
        from: RouterAddr,
        fec: RouterAddr,
        label: crate::types::Label,
        ctx: &mut LdpContext,
    ) -> Result<(), DeviceError> {
        debug!("{}: Label Mapping for FEC {} with label {} from {}", self.router, fec, label, from);
        let out_interface = ctx
            .ted
            .local_interface(self.router, from)
            .ok_or(DeviceError::NoRouteToDestination(from))?;

        // respond to the pending requests for this FEC
        let mut drained = Vec::new();
        self.pending.retain(|p| {
            if p.fec == fec {
                drained.push(p.requester);
                false
            } else {
                true
            }
        });
        for requester in drained {
            match requester {
                Requester::Local => {
                    // we are the ingress for this FEC
                    let in_label =
                        ctx.lib.install(None, None, push_label(label), Some(out_interface), fec.0);
                    info!(
                        "{}: LSP towards {} ready, installed PUSH entry (in label {}, out label {})",
                        self.router, fec, in_label, label
                    );
                }
                Requester::Peer(peer) => {
                    let in_interface = ctx
                        .ted
                        .local_interface(self.router, peer)
                        .ok_or(DeviceError::NoRouteToDestination(peer))?;
                    let in_label = ctx.lib.install(
                        None,
                        Some(in_interface),
                        swap_label(label),
                        Some(out_interface),
                        fec.0,
                    );
                    info!(
                        "{}: relaying mapping for {} to {} (in label {}, out label {})",
                        self.router, fec, peer, in_label, label
                    );
                    ctx.queue.push_back(Event::Ldp(
                        self.router,
                        peer,
                        LdpMessage::LabelMapping { fec, label: in_label },
                    ));
                }
            }
        }
        Ok(())
    }
}
