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

//! # RSVP-TE protocol engine
//!
//! Per-router soft state (path, reservation and traffic-control state
//! blocks), admission control, reservation with preemption, and label
//! installation. One instance runs on every router; it reacts to one
//! delivered message at a time and runs to completion.
//!
//! Router roles are computed per session: a router is the ingress of a
//! session iff the matching path state was originated locally (it has no
//! incoming interface), and the egress iff the session destination is the
//! router itself.

use crate::arena::{Arena, SlotId};
use crate::cspf;
use crate::event::{Event, EventQueue};
use crate::lib_table::{pop_label, push_label, swap_label, LibTable};
use crate::messages::{
    ErrorCode, FilterSpec, FlowDescriptor, FlowSpec, PathErrMsg, PathMsg, PathTearMsg,
    ReservationStyle, ResvErrMsg, ResvMsg, ResvTearMsg, RsvpHop, RsvpMessage, SenderTemplate,
    SessionObj, FLOW_SLOTS,
};
use crate::ted::{Ted, TedService};
use crate::types::{
    Bandwidth, DeviceError, IgpTable, InterfaceAddr, Label, RouterAddr, PRIORITY_LEVELS,
};
use log::*;

/// Collaborators a message handler works against: the shared TED service,
/// the router's label table and IGP forwarding table, and the event queue.
pub struct RsvpContext<'a> {
    /// Shared TED service (snapshot on read, publish on write)
    pub ted: &'a mut TedService,
    /// This router's label information base
    pub lib: &'a mut LibTable,
    /// This router's IGP forwarding table
    pub igp: &'a IgpTable,
    /// The global event queue
    pub queue: &'a mut EventQueue,
}

/// Notifications handed up to the application layer at the head or tail
/// end of a tunnel.
#[derive(Debug, Clone, PartialEq)]
pub enum AppSignal {
    /// A RESV reached the ingress: the LSP is established.
    ResvArrived(ResvMsg),
    /// A PATH TEAR reached the egress.
    PathTearArrived(PathTearMsg),
    /// A RESV TEAR reached the ingress: the LSP was torn down.
    ResvTearArrived(ResvTearMsg),
    /// A PATH ERROR reached the ingress.
    PathErrArrived(PathErrMsg),
}

/// Path State Block: one per (session, sender template, incoming
/// interface).
#[derive(Debug, Clone, PartialEq)]
pub struct PathStateBlock {
    /// Session of the tunnel
    pub session: SessionObj,
    /// Sender template
    pub sender: SenderTemplate,
    /// Sender Tspec
    pub tspec: FlowSpec,
    /// Previous hop address
    pub phop: RouterAddr,
    /// Logical interface handle received with the PATH
    pub lih: Option<InterfaceAddr>,
    /// Incoming interface; `None` when the path was originated locally
    /// (this router is the ingress for the session).
    pub in_interface: Option<InterfaceAddr>,
    /// Outgoing interface; `None` when signaling terminates here (this
    /// router is the egress).
    pub out_interface: Option<InterfaceAddr>,
    /// Label request marker
    pub label_request: bool,
    /// Distinguishes "admission-checked but not yet installed" from
    /// "actually forwarding".
    pub resource_allocated: bool,
}

/// One filter slot of a reservation state block.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSlot {
    /// The sender reserved for
    pub filter: FilterSpec,
    /// The label this router allocated for the sender (sent upstream)
    pub label: Option<Label>,
    /// The label the downstream neighbor advertised
    pub downstream_label: Option<Label>,
    /// Record route as received from downstream
    pub rro: Vec<RouterAddr>,
}

/// Reservation State Block: one per (session, downstream neighbor).
#[derive(Debug, Clone, PartialEq)]
pub struct ResvStateBlock {
    /// Session of the tunnel
    pub session: SessionObj,
    /// The downstream neighbor the RESV arrived from
    pub next_hop: RouterAddr,
    /// Outgoing interface the reservation applies to
    pub out_interface: InterfaceAddr,
    /// Reservation style
    pub style: ReservationStyle,
    /// Fixed-capacity filter slots
    pub filters: [Option<FilterSlot>; FLOW_SLOTS],
    /// Reserved flowspec
    pub flowspec: FlowSpec,
}

impl ResvStateBlock {
    /// Slot index holding the given filter, if any.
    fn slot_of(&self, filter: &FilterSpec) -> Option<usize> {
        self.filters
            .iter()
            .position(|s| s.as_ref().map(|s| s.filter == *filter).unwrap_or(false))
    }

    /// First free slot index.
    fn free_slot(&self) -> Option<usize> {
        self.filters.iter().position(|s| s.is_none())
    }
}

/// Traffic Control State Block: the merged reservation per (session,
/// outgoing interface).
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficControlStateBlock {
    /// Session of the tunnel
    pub session: SessionObj,
    /// Outgoing interface
    pub out_interface: InterfaceAddr,
    /// Filter specs of all merged reservations
    pub filters: [Option<FilterSpec>; FLOW_SLOTS],
    /// Merged (least-upper-bound) flowspec across the RSBs on this
    /// interface
    pub tc_flowspec: FlowSpec,
    /// Summed sender Tspecs feeding this interface
    pub tc_tspec: FlowSpec,
    /// Flowspec forwarded after admission
    pub fwd_flowspec: FlowSpec,
    /// Reservation handle into the flow table
    pub rhandle: u32,
}

/// One admitted allocation against the TED; the unit of preemption.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowTableEntry {
    /// Tunnel id, doubling as the reservation handle
    pub handle: u32,
    /// Outgoing interface the bandwidth is reserved on
    pub out_interface: InterfaceAddr,
    /// Holding priority of the reservation
    pub holding_pri: u8,
    /// Setup priority of the reservation
    pub setup_pri: u8,
    /// Reserved flowspec
    pub flowspec: FlowSpec,
    /// Sender Tspec at reservation time
    pub tspec: FlowSpec,
    /// The exact amount debited from the TED (credited back on release)
    pub reserved: Bandwidth,
}

/// The RSVP-TE engine of one router.
#[derive(Debug, Clone)]
pub struct RsvpProcess {
    router: RouterAddr,
    psbs: Arena<PathStateBlock>,
    rsbs: Arena<ResvStateBlock>,
    tcsbs: Arena<TrafficControlStateBlock>,
    flow_table: Vec<FlowTableEntry>,
}

impl RsvpProcess {
    /// New engine for the router with the given address.
    pub fn new(router: RouterAddr) -> Self {
        Self {
            router,
            psbs: Arena::new(),
            rsbs: Arena::new(),
            tcsbs: Arena::new(),
            flow_table: Vec::new(),
        }
    }

    /// Path state blocks (for inspection).
    pub fn psbs(&self) -> &Arena<PathStateBlock> {
        &self.psbs
    }

    /// Reservation state blocks (for inspection).
    pub fn rsbs(&self) -> &Arena<ResvStateBlock> {
        &self.rsbs
    }

    /// Traffic control state blocks (for inspection).
    pub fn tcsbs(&self) -> &Arena<TrafficControlStateBlock> {
        &self.tcsbs
    }

    /// The flow table (for inspection).
    pub fn flow_table(&self) -> &[FlowTableEntry] {
        &self.flow_table
    }

    /// Handle one delivered message. `from` is the emitting router (this
    /// router itself for messages handed over by the application layer).
    pub fn process(
        &mut self,
        from: RouterAddr,
        msg: RsvpMessage,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        match msg {
            RsvpMessage::Path(m) => {
                let in_if = if from == self.router {
                    None
                } else {
                    ctx.ted.current().local_interface(self.router, from)
                };
                self.process_path(m, in_if, ctx)
            }
            RsvpMessage::Resv(m) => self.process_resv(m, ctx),
            RsvpMessage::PathTear(m) => self.process_path_tear(m, ctx),
            RsvpMessage::ResvTear(m) => self.process_resv_tear(m, ctx),
            RsvpMessage::PathErr(m) => self.process_path_err(m, ctx),
            RsvpMessage::ResvErr(m) => self.process_resv_err(m, ctx),
        }
    }

    /// True iff this router is the egress for the session.
    fn is_egress(&self, session: &SessionObj) -> bool {
        session.dest == self.router
    }

    // ------------------
    // PATH processing
    // ------------------

    fn process_path(
        &mut self,
        msg: PathMsg,
        in_if: Option<InterfaceAddr>,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let mut signals = Vec::new();
        debug!(
            "{}: PATH for lsp {} towards {} (phop {})",
            self.router, msg.sender.lsp_id, msg.session.dest, msg.hop.neighbor
        );

        // sanity checks; a violation aborts processing of this message
        for (_, psb) in self.psbs.iter() {
            if psb.session.dest == msg.session.dest
                && psb.session.protocol_id == msg.session.protocol_id
                && psb.session.dest_port != msg.session.dest_port
                && (psb.session.dest_port == 0 || msg.session.dest_port == 0)
            {
                return Err(DeviceError::ConflictingDestPort);
            }
            if psb.sender.src == msg.sender.src
                && psb.sender.src_port != msg.sender.src_port
                && (psb.sender.src_port == 0 || msg.sender.src_port == 0)
            {
                return Err(DeviceError::AmbiguousSenderPort);
            }
        }

        let matching = self
            .psbs
            .iter()
            .find(|(_, p)| {
                msg.session.same_session(&p.session)
                    && p.sender == msg.sender
                    && p.in_interface == in_if
            })
            .map(|(id, _)| id);

        let mut path_refresh_needed = false;
        let psb_id = match matching {
            Some(id) => {
                // copy changed PHOP / LIH / Tspec into the PSB
                if let Some(psb) = self.psbs.get_mut(id) {
                    if msg.hop.neighbor != psb.phop
                        || msg.hop.lih != psb.lih
                        || psb.tspec != msg.tspec
                    {
                        psb.phop = msg.hop.neighbor;
                        psb.lih = msg.hop.lih;
                        psb.tspec = msg.tspec;
                        path_refresh_needed = true;
                    }
                }
                id
            }
            None if self.is_egress(&msg.session) => {
                // signaling terminates here: install the POP entry and
                // answer with a RESV carrying the freshly allocated label
                self.psbs.insert(PathStateBlock {
                    session: msg.session,
                    sender: msg.sender,
                    tspec: msg.tspec,
                    phop: msg.hop.neighbor,
                    lih: msg.hop.lih,
                    in_interface: in_if,
                    out_interface: None,
                    label_request: msg.label_request,
                    resource_allocated: true,
                });
                let in_label = ctx.lib.install(None, in_if, pop_label(), None, msg.sender.lsp_id.0);
                info!(
                    "{}: egress for lsp {}, installed POP entry with label {}",
                    self.router, msg.sender.lsp_id, in_label
                );
                let resv = ResvMsg {
                    session: msg.session,
                    hop: RsvpHop { neighbor: self.router, lih: msg.hop.lih },
                    style: ReservationStyle::FixedFilter,
                    flow_descriptors: vec![FlowDescriptor {
                        filter: msg.sender,
                        flowspec: msg.tspec,
                        label: Some(in_label),
                        rro: vec![self.router],
                    }],
                };
                ctx.queue.push_back(Event::Rsvp(
                    self.router,
                    msg.hop.neighbor,
                    RsvpMessage::Resv(resv),
                ));
                return Ok(signals);
            }
            None => {
                // transit or head end: derive the route, then run CAC
                let ted = ctx.ted.snapshot();
                let (out_if, ero) = self.route_path(&msg, &ted, ctx.igp)?;
                if !self.cac_check(&msg, out_if, &ted)? {
                    info!(
                        "{}: admission control failed for lsp {} towards {}",
                        self.router, msg.sender.lsp_id, msg.session.dest
                    );
                    let err = PathErrMsg {
                        session: msg.session,
                        sender: msg.sender,
                        tspec: msg.tspec,
                        error_code: ErrorCode::AdmissionFailure,
                        error_node: self.router,
                    };
                    if msg.hop.neighbor == self.router {
                        signals.push(AppSignal::PathErrArrived(err));
                    } else {
                        ctx.queue.push_back(Event::Rsvp(
                            self.router,
                            msg.hop.neighbor,
                            RsvpMessage::PathErr(err),
                        ));
                    }
                    return Ok(signals);
                }
                let id = self.psbs.insert(PathStateBlock {
                    session: msg.session,
                    sender: msg.sender,
                    tspec: msg.tspec,
                    phop: msg.hop.neighbor,
                    lih: msg.hop.lih,
                    in_interface: in_if,
                    out_interface: Some(out_if),
                    label_request: msg.label_request,
                    resource_allocated: false,
                });
                trace!("{}: created PSB for lsp {}", self.router, msg.sender.lsp_id);
                self.refresh_path(id, ero, ctx)?;
                if let Some(rsb_id) = self.active_rsb(&msg.sender, out_if) {
                    if !self.update_traffic_control(rsb_id, ctx)? {
                        warn!("{}: traffic control update failed on path arrival", self.router);
                    }
                }
                return Ok(signals);
            }
        };

        if !path_refresh_needed {
            trace!("{}: no path refresh needed", self.router);
            return Ok(signals);
        }

        // PATH REFRESH sequence for the updated PSB
        self.refresh_path(psb_id, msg.ero.clone(), ctx)?;
        let oi = self.psbs.get(psb_id).and_then(|p| p.out_interface);
        if let Some(oi) = oi {
            if let Some(rsb_id) = self.active_rsb(&msg.sender, oi) {
                if !self.update_traffic_control(rsb_id, ctx)? {
                    warn!("{}: traffic control update failed on path refresh", self.router);
                }
            }
        }
        Ok(signals)
    }

    /// Derive the outgoing interface and the remaining explicit route for a
    /// PATH message. A loose next hop re-derives the tail via CSPF; without
    /// an ERO the IGP forwarding table decides.
    fn route_path(
        &self,
        msg: &PathMsg,
        ted: &Ted,
        igp: &IgpTable,
    ) -> Result<(InterfaceAddr, Option<Vec<crate::messages::EroHop>>), DeviceError> {
        if let Some(hops) = &msg.ero {
            let mut hops = hops.clone();
            while hops.first().map(|h| h.node) == Some(self.router) {
                hops.remove(0);
            }
            if let Some(next) = hops.first().copied() {
                if next.loose {
                    // re-derive the route from this point forward
                    match cspf::compute_ero(
                        ted,
                        self.router,
                        msg.session.dest,
                        &msg.tspec,
                        msg.session.setup_pri,
                    ) {
                        Some(path) => {
                            hops = path
                                .hops
                                .iter()
                                .map(|n| crate::messages::EroHop { node: *n, loose: false })
                                .collect();
                        }
                        None => {
                            warn!(
                                "{}: no constrained route towards {}, falling back to hop-by-hop",
                                self.router, msg.session.dest
                            );
                            return self.route_hop_by_hop(msg.session.dest, ted, igp).map(|oi| (oi, None));
                        }
                    }
                }
                let next = match hops.first() {
                    Some(h) => h.node,
                    None => return self.route_hop_by_hop(msg.session.dest, ted, igp).map(|oi| (oi, None)),
                };
                let out_if = ted
                    .local_interface(self.router, next)
                    .ok_or(DeviceError::NoRouteToDestination(next))?;
                return Ok((out_if, Some(hops)));
            }
        }
        self.route_hop_by_hop(msg.session.dest, ted, igp).map(|oi| (oi, None))
    }

    fn route_hop_by_hop(
        &self,
        dest: RouterAddr,
        ted: &Ted,
        igp: &IgpTable,
    ) -> Result<InterfaceAddr, DeviceError> {
        let next_hop = igp
            .get(&dest)
            .and_then(|e| *e)
            .map(|(nh, _)| nh)
            .ok_or(DeviceError::NoRouteToDestination(dest))?;
        ted.local_interface(self.router, next_hop)
            .ok_or(DeviceError::NoRouteToDestination(next_hop))
    }

    /// Admission control: compare the summed request of all colliding
    /// not-yet-allocated PSBs on the outgoing interface against the
    /// unreserved bandwidth at the setup priority. Pure check, no TED
    /// side effects.
    fn cac_check(
        &self,
        msg: &PathMsg,
        out_if: InterfaceAddr,
        ted: &Ted,
    ) -> Result<bool, DeviceError> {
        let mut request_bw = msg.tspec.bandwidth;
        let mut my_request = msg.tspec.bandwidth;
        for (_, p) in self.psbs.iter() {
            if p.out_interface != Some(out_if) || p.resource_allocated {
                continue;
            }
            if p.session.same_session(&msg.session)
                && p.sender.src == msg.sender.src
                && p.sender.src_port == msg.sender.src_port
            {
                // the same session may appear twice while awaiting its
                // RESV; count it once, at the larger of the two requests
                if p.tspec.bandwidth > my_request {
                    request_bw += p.tspec.bandwidth - my_request;
                    my_request = p.tspec.bandwidth;
                }
            } else {
                request_bw += p.tspec.bandwidth;
            }
        }
        let link = ted
            .link_by_local(self.router, out_if)
            .ok_or(DeviceError::LinkNotFound(out_if))?;
        let available = link.unreserved[msg.session.setup_pri as usize];
        debug!(
            "{}: CAC on link ({}, {}): requested {}, available {}",
            self.router, link.advrouter, link.linkid, request_bw, available
        );
        Ok(available >= request_bw)
    }

    /// Forward a refreshed PATH downstream over the PSB's outgoing
    /// interface.
    fn refresh_path(
        &mut self,
        psb_id: SlotId,
        ero: Option<Vec<crate::messages::EroHop>>,
        ctx: &mut RsvpContext,
    ) -> Result<(), DeviceError> {
        let psb = match self.psbs.get(psb_id) {
            Some(p) => p.clone(),
            None => return Ok(()),
        };
        let out_if = match psb.out_interface {
            Some(oi) => oi,
            None => return Ok(()), // signaling terminated here
        };
        let ted = ctx.ted.snapshot();
        let peer = ted.peer_addr(self.router, out_if).ok_or(DeviceError::LinkNotFound(out_if))?;
        let ero = ero.map(|mut hops| {
            while hops.first().map(|h| h.node) == Some(self.router) {
                hops.remove(0);
            }
            hops
        });
        let pm = PathMsg {
            session: psb.session,
            sender: psb.sender,
            tspec: psb.tspec,
            hop: RsvpHop { neighbor: self.router, lih: Some(out_if) },
            ero,
            label_request: psb.label_request,
        };
        trace!("{}: forwarding PATH to {}", self.router, peer);
        ctx.queue.push_back(Event::Rsvp(self.router, peer, RsvpMessage::Path(pm)));
        Ok(())
    }

    /// RSB whose filter list includes the sender and whose outgoing
    /// interface matches.
    fn active_rsb(&self, sender: &SenderTemplate, out_if: InterfaceAddr) -> Option<SlotId> {
        self.rsbs
            .iter()
            .find(|(_, r)| r.out_interface == out_if && r.slot_of(sender).is_some())
            .map(|(id, _)| id)
    }

    // ------------------
    // RESV processing
    // ------------------

    fn process_resv(
        &mut self,
        msg: ResvMsg,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let mut signals = Vec::new();
        debug!(
            "{}: RESV for {} from {} ({} descriptors)",
            self.router,
            msg.session.dest,
            msg.hop.neighbor,
            msg.flow_descriptors.len()
        );

        if self.psbs.is_empty() {
            return Err(DeviceError::NoPathInformation);
        }
        for (_, p) in self.psbs.iter() {
            for fd in &msg.flow_descriptors {
                if p.sender.src == fd.filter.src
                    && p.sender.src_port != fd.filter.src_port
                    && (p.sender.src_port == 0 || fd.filter.src_port == 0)
                {
                    return Err(DeviceError::AmbiguousSenderPort);
                }
            }
        }
        if !self.psbs.iter().any(|(_, p)| msg.session.same_session(&p.session)) {
            debug!("{}: no path information for the session, dropping RESV", self.router);
            return Ok(signals);
        }
        let oi = match msg.hop.lih {
            Some(oi) => oi,
            None => return Err(DeviceError::NoMatchingPsb),
        };

        // FF: every descriptor is processed independently; SE: the whole
        // filter list is processed once
        let passes: Vec<Vec<usize>> = match msg.style {
            ReservationStyle::FixedFilter => {
                (0..msg.flow_descriptors.len()).map(|i| vec![i]).collect()
            }
            ReservationStyle::SharedExplicit => vec![(0..msg.flow_descriptors.len()).collect()],
        };

        let mut refresh_phops: Vec<RouterAddr> = Vec::new();
        let mut matched_psbs: Vec<SlotId> = Vec::new();
        let mut resv_refresh_needed = false;
        let mut rsb_for_refresh = None;

        for pass in passes {
            // locate the path state this pass reserves for
            let mut loc: Vec<SlotId> = Vec::new();
            for &k in &pass {
                let filter = msg.flow_descriptors[k].filter;
                if let Some((id, _)) = self
                    .psbs
                    .iter()
                    .find(|(_, p)| p.sender == filter && p.out_interface == Some(oi))
                {
                    loc.push(id);
                }
            }
            if loc.is_empty() {
                debug!("{}: no sender information for the RESV, dropping", self.router);
                return Ok(signals);
            }
            for &id in &loc {
                if let Some(p) = self.psbs.get(id) {
                    if !refresh_phops.contains(&p.phop) {
                        refresh_phops.push(p.phop);
                    }
                }
            }
            matched_psbs.extend(loc.iter().copied());

            // find or create the reservation state for (session, next hop)
            let existing = self
                .rsbs
                .iter()
                .find(|(_, r)| {
                    msg.session.same_session(&r.session) && r.next_hop == msg.hop.neighbor
                })
                .map(|(id, _)| id);
            let (rsb_id, before, mut new_or_mod) = match existing {
                Some(id) => (id, self.rsbs.get(id).cloned(), false),
                None => {
                    let id = self.rsbs.insert(ResvStateBlock {
                        session: msg.session,
                        next_hop: msg.hop.neighbor,
                        out_interface: oi,
                        style: msg.style,
                        filters: Default::default(),
                        flowspec: FlowSpec::default(),
                    });
                    trace!("{}: created RSB for next hop {}", self.router, msg.hop.neighbor);
                    (id, None, true)
                }
            };

            // merge the descriptors of this pass into the filter slots
            {
                let rsb = self.rsbs.get_mut(rsb_id).ok_or(DeviceError::NoMatchingPsb)?;
                for &k in &pass {
                    let fd = &msg.flow_descriptors[k];
                    let slot_idx = rsb
                        .slot_of(&fd.filter)
                        .or_else(|| rsb.free_slot())
                        .ok_or(DeviceError::FilterSlotsExhausted)?;
                    let changed = rsb.filters[slot_idx]
                        .as_ref()
                        .map(|s| s.filter != fd.filter || s.rro != fd.rro)
                        .unwrap_or(true);
                    if changed {
                        let (label, downstream_label) = rsb.filters[slot_idx]
                            .as_ref()
                            .filter(|s| s.filter == fd.filter)
                            .map(|s| (s.label, s.downstream_label))
                            .unwrap_or((None, None));
                        rsb.filters[slot_idx] = Some(FilterSlot {
                            filter: fd.filter,
                            label,
                            downstream_label,
                            rro: fd.rro.clone(),
                        });
                        new_or_mod = true;
                    }
                }
                if let Some(&k) = pass.first() {
                    let fs = msg.flow_descriptors[k].flowspec;
                    if rsb.flowspec != fs {
                        rsb.flowspec = fs;
                        new_or_mod = true;
                    }
                }
            }
            if !new_or_mod {
                trace!("{}: reservation state unchanged, suppressing refresh", self.router);
                continue;
            }

            if self.update_traffic_control(rsb_id, ctx)? {
                resv_refresh_needed = true;
                rsb_for_refresh = Some(rsb_id);
            } else {
                // reservation failed after exhausting preemption: leave no
                // partial state behind and report downstream
                info!("{}: reservation failed for {}", self.router, msg.session.dest);
                match before {
                    Some(prev) => {
                        if let Some(r) = self.rsbs.get_mut(rsb_id) {
                            *r = prev;
                        }
                    }
                    None => {
                        self.rsbs.remove(rsb_id);
                    }
                }
                let err = ResvErrMsg {
                    session: msg.session,
                    error_code: ErrorCode::ReservationFailure,
                    error_node: self.router,
                };
                ctx.queue.push_back(Event::Rsvp(
                    self.router,
                    msg.hop.neighbor,
                    RsvpMessage::ResvErr(err),
                ));
            }
        }

        if !resv_refresh_needed {
            return Ok(signals);
        }
        let rsb_id = match rsb_for_refresh {
            Some(id) => id,
            None => return Ok(signals),
        };

        // install the labels advertised in the message
        let is_ingress = matched_psbs
            .iter()
            .any(|&id| self.psbs.get(id).map(|p| p.in_interface.is_none()).unwrap_or(false));
        let ted = ctx.ted.snapshot();
        for fd in msg.flow_descriptors.iter().take(FLOW_SLOTS) {
            let out_label = match fd.label {
                Some(l) => l,
                None => continue,
            };
            let fec = fd.filter.lsp_id.0;
            let slot_state = self
                .rsbs
                .get(rsb_id)
                .and_then(|r| r.slot_of(&fd.filter).map(|i| (i, r.filters[i].clone())));
            let (slot_idx, slot) = match slot_state {
                Some((i, Some(s))) => (i, s),
                _ => continue,
            };
            if slot.downstream_label == Some(out_label) && slot.label.is_some() {
                continue; // label already installed and unchanged
            }
            let in_label = if is_ingress {
                // ingress entries are classified by FEC, not incoming label
                ctx.lib.install(slot.label, None, push_label(out_label), Some(oi), fec)
            } else {
                let phop = match self
                    .psbs
                    .iter()
                    .find(|(_, p)| p.sender == fd.filter && p.out_interface == Some(oi))
                    .map(|(_, p)| p.phop)
                {
                    Some(ph) => ph,
                    None => continue,
                };
                let in_if = ted
                    .local_interface(self.router, phop)
                    .ok_or(DeviceError::NoRouteToDestination(phop))?;
                ctx.lib.install(slot.label, Some(in_if), swap_label(out_label), Some(oi), fec)
            };
            info!(
                "{}: installed {} entry: in label {}, out label {}, fec {}",
                self.router,
                if is_ingress { "PUSH" } else { "SWAP" },
                in_label,
                out_label,
                fec
            );
            if let Some(r) = self.rsbs.get_mut(rsb_id) {
                if let Some(s) = r.filters[slot_idx].as_mut() {
                    s.label = Some(in_label);
                    s.downstream_label = Some(out_label);
                }
            }
        }

        for &id in &matched_psbs {
            if let Some(p) = self.psbs.get_mut(id) {
                p.resource_allocated = true;
            }
        }

        if is_ingress {
            signals.push(AppSignal::ResvArrived(msg));
        } else {
            for ph in refresh_phops {
                self.refresh_resv(rsb_id, ph, ctx)?;
            }
        }
        Ok(signals)
    }

    /// Send a RESV refresh upstream to the given previous hop.
    fn refresh_resv(
        &mut self,
        rsb_id: SlotId,
        phop: RouterAddr,
        ctx: &mut RsvpContext,
    ) -> Result<(), DeviceError> {
        let ted = ctx.ted.snapshot();
        let rsb = match self.rsbs.get(rsb_id) {
            Some(r) => r.clone(),
            None => return Ok(()),
        };
        // the TCSB carries the merged flowspec for the interface
        let merged = self
            .tcsbs
            .iter()
            .find(|(_, t)| {
                t.session.same_session(&rsb.session) && t.out_interface == rsb.out_interface
            })
            .map(|(_, t)| t.tc_flowspec)
            .unwrap_or(rsb.flowspec);
        let mut descriptors = Vec::new();
        for slot in rsb.filters.iter().flatten() {
            let matches_phop = self.psbs.iter().any(|(_, p)| {
                p.phop == phop
                    && p.sender == slot.filter
                    && rsb.session.same_session(&p.session)
                    && p.out_interface == Some(rsb.out_interface)
            });
            if !matches_phop {
                continue;
            }
            let mut rro = slot.rro.clone();
            rro.push(self.router);
            descriptors.push(FlowDescriptor {
                filter: slot.filter,
                flowspec: merged,
                label: slot.label,
                rro,
            });
        }
        if descriptors.is_empty() {
            return Ok(());
        }
        let lih = ted
            .peer_interface(self.router, phop)
            .ok_or(DeviceError::NoRouteToDestination(phop))?;
        let resv = ResvMsg {
            session: rsb.session,
            hop: RsvpHop { neighbor: self.router, lih: Some(lih) },
            style: rsb.style,
            flow_descriptors: descriptors,
        };
        trace!("{}: sending RESV refresh to {}", self.router, phop);
        ctx.queue.push_back(Event::Rsvp(self.router, phop, RsvpMessage::Resv(resv)));
        Ok(())
    }

    // ------------------
    // Traffic control
    // ------------------

    /// Recompute the merged reservation for the RSB's interface and drive
    /// the flow-table allocation. `Ok(false)` is a protocol-level
    /// reservation failure (the caller reports it via ResvErr).
    fn update_traffic_control(
        &mut self,
        rsb_id: SlotId,
        ctx: &mut RsvpContext,
    ) -> Result<bool, DeviceError> {
        let rsb = match self.rsbs.get(rsb_id) {
            Some(r) => r.clone(),
            None => return Ok(true),
        };
        let oi = rsb.out_interface;

        // summed sender Tspecs feeding this interface
        let mut path_te = FlowSpec::default();
        for (_, p) in self.psbs.iter() {
            if !p.session.same_session(&rsb.session) || p.out_interface != Some(oi) {
                continue;
            }
            if rsb.filters.iter().flatten().any(|s| s.filter == p.sender) {
                path_te.bandwidth += p.tspec.bandwidth;
                path_te.delay += p.tspec.delay;
            }
        }

        // merged flowspec: LUB across all RSBs sharing (session, OI)
        let mut tc_flowspec = FlowSpec::default();
        let mut tc_filters: [Option<FilterSpec>; FLOW_SLOTS] = Default::default();
        let mut inx = 0;
        for (_, r) in self.rsbs.iter() {
            if !r.session.same_session(&rsb.session) || r.out_interface != oi {
                continue;
            }
            tc_flowspec = tc_flowspec.lub(&r.flowspec);
            for slot in r.filters.iter().flatten() {
                if inx < FLOW_SLOTS {
                    tc_filters[inx] = Some(slot.filter);
                    inx += 1;
                }
            }
        }
        debug!(
            "{}: merged flowspec on {}: bandwidth {}, delay {}",
            self.router, oi, tc_flowspec.bandwidth, tc_flowspec.delay
        );

        let found = self
            .tcsbs
            .iter()
            .find(|(_, t)| t.session.same_session(&rsb.session) && t.out_interface == oi)
            .map(|(id, _)| id);

        // a merged reservation of zero releases the interface entirely
        if tc_flowspec.bandwidth == 0.0 {
            if let Some(t_id) = found {
                if let Some(handle) = self.tcsbs.get(t_id).map(|t| t.rhandle) {
                    self.release_resource(handle, oi, ctx)?;
                }
                self.tcsbs.remove(t_id);
            }
            return Ok(true);
        }

        match found {
            None => {
                match self.tc_add_flowspec(
                    rsb.session.tunnel_id,
                    rsb.session.holding_pri,
                    rsb.session.setup_pri,
                    oi,
                    tc_flowspec,
                    path_te,
                    ctx,
                )? {
                    Some(handle) => {
                        let fwd = self.forwarded_flowspec(oi);
                        self.tcsbs.insert(TrafficControlStateBlock {
                            session: rsb.session,
                            out_interface: oi,
                            filters: tc_filters,
                            tc_flowspec,
                            tc_tspec: path_te,
                            fwd_flowspec: fwd,
                            rhandle: handle,
                        });
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            Some(t_id) => {
                let (changed, handle) = match self.tcsbs.get(t_id) {
                    Some(t) => {
                        (t.tc_flowspec != tc_flowspec || t.tc_tspec != path_te, t.rhandle)
                    }
                    None => return Ok(true),
                };
                if !changed {
                    return Ok(true);
                }
                match self.tc_mod_flowspec(handle, oi, tc_flowspec, path_te, ctx)? {
                    Some(_) => {
                        let fwd = self.forwarded_flowspec(oi);
                        if let Some(t) = self.tcsbs.get_mut(t_id) {
                            t.tc_flowspec = tc_flowspec;
                            t.tc_tspec = path_te;
                            t.filters = tc_filters;
                            t.fwd_flowspec = fwd;
                        }
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    /// Admit a new reservation and record it in the flow table.
    fn tc_add_flowspec(
        &mut self,
        tunnel_id: u32,
        holding_pri: u8,
        setup_pri: u8,
        oi: InterfaceAddr,
        flowspec: FlowSpec,
        tspec: FlowSpec,
        ctx: &mut RsvpContext,
    ) -> Result<Option<u32>, DeviceError> {
        let reserved = flowspec.bandwidth.min(tspec.bandwidth);
        if self.allocate_resource(tunnel_id, holding_pri, setup_pri, oi, reserved, ctx)? {
            self.flow_table.push(FlowTableEntry {
                handle: tunnel_id,
                out_interface: oi,
                holding_pri,
                setup_pri,
                flowspec,
                tspec,
                reserved,
            });
            Ok(Some(tunnel_id))
        } else {
            Ok(None)
        }
    }

    /// Modify an existing reservation by the difference to its current
    /// allocation. A failed grow leaves the old reservation untouched.
    fn tc_mod_flowspec(
        &mut self,
        handle: u32,
        oi: InterfaceAddr,
        flowspec: FlowSpec,
        tspec: FlowSpec,
        ctx: &mut RsvpContext,
    ) -> Result<Option<u32>, DeviceError> {
        let idx = self
            .flow_table
            .iter()
            .position(|e| e.handle == handle && e.out_interface == oi)
            .ok_or(DeviceError::NoFlowTableEntry(handle))?;
        let (holding_pri, setup_pri, old_reserved) = {
            let e = &self.flow_table[idx];
            (e.holding_pri, e.setup_pri, e.reserved)
        };
        let new_reserved = flowspec.bandwidth.min(tspec.bandwidth);
        let delta = new_reserved - old_reserved;
        if delta > 0.0 {
            if !self.allocate_resource(handle, holding_pri, setup_pri, oi, delta, ctx)? {
                return Ok(None);
            }
        } else if delta < 0.0 {
            self.credit(oi, holding_pri, -delta, ctx)?;
        }
        let e = &mut self.flow_table[idx];
        e.flowspec = flowspec;
        e.tspec = tspec;
        e.reserved = new_reserved;
        e.out_interface = oi;
        Ok(Some(handle))
    }

    /// Sum of all admitted reservations on the interface.
    fn forwarded_flowspec(&self, oi: InterfaceAddr) -> FlowSpec {
        let mut fwd = FlowSpec::default();
        for e in self.flow_table.iter().filter(|e| e.out_interface == oi) {
            fwd.bandwidth += e.flowspec.bandwidth;
            fwd.delay += e.flowspec.delay;
        }
        fwd
    }

    /// Credit bandwidth back to the TED at all levels weaker than or equal
    /// to the holding priority.
    fn credit(
        &mut self,
        oi: InterfaceAddr,
        holding_pri: u8,
        amount: Bandwidth,
        ctx: &mut RsvpContext,
    ) -> Result<(), DeviceError> {
        let mut ted = ctx.ted.snapshot();
        {
            let link = ted
                .link_by_local_mut(self.router, oi)
                .ok_or(DeviceError::LinkNotFound(oi))?;
            for p in holding_pri as usize..PRIORITY_LEVELS {
                link.unreserved[p] += amount;
            }
        }
        ctx.ted.publish(ted);
        Ok(())
    }

    /// Release an admitted reservation: credit its exact debit back to the
    /// TED and drop the flow-table entry.
    fn release_resource(
        &mut self,
        handle: u32,
        oi: InterfaceAddr,
        ctx: &mut RsvpContext,
    ) -> Result<(), DeviceError> {
        let idx = self
            .flow_table
            .iter()
            .position(|e| e.handle == handle && e.out_interface == oi)
            .ok_or(DeviceError::NoFlowTableEntry(handle))?;
        let e = self.flow_table.remove(idx);
        debug!("{}: releasing {} on {} (tunnel {})", self.router, e.reserved, e.out_interface, handle);
        self.credit(e.out_interface, e.holding_pri, e.reserved, ctx)
    }

    /// Admission + reservation + preemption.
    ///
    /// `unreserved[7]` is the actual residual capacity of the link; when it
    /// does not cover the request, reservations with a weaker holding
    /// priority than the requester's setup priority are torn down, weakest
    /// first, until the shortfall is covered. Feasibility is established
    /// before any state is mutated; an infeasible request is denied without
    /// side effects.
    fn allocate_resource(
        &mut self,
        tunnel_id: u32,
        holding_pri: u8,
        setup_pri: u8,
        oi: InterfaceAddr,
        bandwidth: Bandwidth,
        ctx: &mut RsvpContext,
    ) -> Result<bool, DeviceError> {
        debug!(
            "{}: allocate {} on {} (tunnel {}, holding {}, setup {})",
            self.router, bandwidth, oi, tunnel_id, holding_pri, setup_pri
        );
        let mut ted = ctx.ted.snapshot();
        let link = ted
            .link_by_local_mut(self.router, oi)
            .ok_or(DeviceError::LinkNotFound(oi))?;

        if link.unreserved[PRIORITY_LEVELS - 1] >= bandwidth {
            for p in holding_pri as usize..PRIORITY_LEVELS {
                link.unreserved[p] -= bandwidth;
            }
            ctx.ted.publish(ted);
            return Ok(true);
        }

        // preemption: find enough weaker reservations on this interface to
        // cover the shortfall before touching anything
        let needed = bandwidth - link.unreserved[PRIORITY_LEVELS - 1];
        let mut victims: Vec<(u32, u8, Bandwidth)> = self
            .flow_table
            .iter()
            .filter(|e| {
                e.handle != tunnel_id && e.out_interface == oi && e.holding_pri > setup_pri
            })
            .map(|e| (e.handle, e.holding_pri, e.reserved))
            .collect();
        victims.sort_by(|a, b| b.1.cmp(&a.1));
        let mut chosen = Vec::new();
        let mut released = 0.0;
        for v in victims {
            if released >= needed {
                break;
            }
            released += v.2;
            chosen.push(v);
        }
        if released < needed {
            info!(
                "{}: cannot release enough bandwidth on {} ({} < {}), request denied",
                self.router, oi, released, needed
            );
            return Ok(false);
        }

        // commit: tear the chosen tunnels down, credit their exact debit,
        // then place the new reservation
        for (handle, victim_holding, reserved) in chosen {
            info!(
                "{}: preempting tunnel {} (holding {}), releasing {}",
                self.router, handle, victim_holding, reserved
            );
            for p in victim_holding as usize..PRIORITY_LEVELS {
                link.unreserved[p] += reserved;
            }
            self.flow_table.retain(|e| e.handle != handle);
            self.preempt_tunnel(handle, ctx);
            for t_id in self.tcsbs.ids() {
                if self.tcsbs.get(t_id).map(|t| t.session.tunnel_id == handle).unwrap_or(false) {
                    self.tcsbs.remove(t_id);
                }
            }
        }
        for p in holding_pri as usize..PRIORITY_LEVELS {
            link.unreserved[p] -= bandwidth;
        }
        ctx.ted.publish(ted);
        Ok(true)
    }

    /// Tear down a preempted tunnel: PATH TEAR towards the egress, RESV
    /// TEAR towards the ingress, and removal of the local state.
    fn preempt_tunnel(&mut self, tunnel_id: u32, ctx: &mut RsvpContext) {
        info!("{}: tearing down preempted tunnel {}", self.router, tunnel_id);
        let ted = ctx.ted.snapshot();
        let mut phops: Vec<RouterAddr> = Vec::new();
        for id in self.psbs.ids() {
            let (session, sender, phop, out_if, local) = match self.psbs.get(id) {
                Some(p) if p.session.tunnel_id == tunnel_id => {
                    (p.session, p.sender, p.phop, p.out_interface, p.in_interface.is_none())
                }
                _ => continue,
            };
            if let Some(oi) = out_if {
                if let Some(peer) = ted.peer_addr(self.router, oi) {
                    ctx.queue.push_back(Event::Rsvp(
                        self.router,
                        peer,
                        RsvpMessage::PathTear(PathTearMsg { session, sender }),
                    ));
                }
            }
            if !local && !phops.contains(&phop) {
                phops.push(phop);
            }
            self.psbs.remove(id);
        }
        for id in self.rsbs.ids() {
            let rsb = match self.rsbs.get(id) {
                Some(r) if r.session.tunnel_id == tunnel_id => r.clone(),
                _ => continue,
            };
            for ph in &phops {
                let lih = ted.peer_interface(self.router, *ph);
                let descriptors = rsb
                    .filters
                    .iter()
                    .flatten()
                    .map(|s| FlowDescriptor {
                        filter: s.filter,
                        flowspec: rsb.flowspec,
                        label: s.label,
                        rro: s.rro.clone(),
                    })
                    .collect();
                ctx.queue.push_back(Event::Rsvp(
                    self.router,
                    *ph,
                    RsvpMessage::ResvTear(ResvTearMsg {
                        session: rsb.session,
                        hop: RsvpHop { neighbor: self.router, lih },
                        flow_descriptors: descriptors,
                    }),
                ));
            }
            for slot in rsb.filters.iter().flatten() {
                if let Some(l) = slot.label {
                    if ctx.lib.remove(l).is_err() {
                        warn!("{}: label {} of preempted tunnel already gone", self.router, l);
                    }
                }
            }
            self.rsbs.remove(id);
        }
    }

    // ------------------
    // Teardown and errors
    // ------------------

    fn process_path_tear(
        &mut self,
        msg: PathTearMsg,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let mut signals = Vec::new();
        debug!("{}: PATH TEAR for lsp {}", self.router, msg.sender.lsp_id);
        let found = self
            .psbs
            .iter()
            .find(|(_, p)| msg.session.same_session(&p.session) && p.sender == msg.sender)
            .map(|(id, _)| id);
        let psb_id = match found {
            Some(id) => id,
            None => {
                debug!("{}: no matching PSB for PATH TEAR", self.router);
                return Ok(signals);
            }
        };
        let psb = match self.psbs.get(psb_id) {
            Some(p) => p.clone(),
            None => return Ok(signals),
        };
        let ted = ctx.ted.snapshot();
        match psb.out_interface {
            Some(oi) => {
                // propagate downstream before deleting local state
                if let Some(peer) = ted.peer_addr(self.router, oi) {
                    ctx.queue.push_back(Event::Rsvp(
                        self.router,
                        peer,
                        RsvpMessage::PathTear(msg.clone()),
                    ));
                }
                // remove the sender from any reservation on this interface
                for rsb_id in self.rsbs.ids() {
                    let matches = match self.rsbs.get(rsb_id) {
                        Some(r) => {
                            r.session.same_session(&msg.session)
                                && r.out_interface == oi
                                && r.slot_of(&psb.sender).is_some()
                        }
                        None => false,
                    };
                    if !matches {
                        continue;
                    }
                    let mut stale_labels = Vec::new();
                    let now_empty = match self.rsbs.get_mut(rsb_id) {
                        Some(r) => {
                            for slot in r.filters.iter_mut() {
                                if slot.as_ref().map(|s| s.filter == psb.sender).unwrap_or(false) {
                                    if let Some(l) = slot.as_ref().and_then(|s| s.label) {
                                        stale_labels.push(l);
                                    }
                                    *slot = None;
                                }
                            }
                            r.filters.iter().all(|s| s.is_none())
                        }
                        None => continue,
                    };
                    for l in stale_labels {
                        if ctx.lib.remove(l).is_err() {
                            warn!("{}: label {} already gone", self.router, l);
                        }
                    }
                    if now_empty {
                        let t_found = self
                            .tcsbs
                            .iter()
                            .find(|(_, t)| {
                                t.session.same_session(&msg.session) && t.out_interface == oi
                            })
                            .map(|(id, t)| (id, t.rhandle));
                        if let Some((t_id, handle)) = t_found {
                            self.release_resource(handle, oi, ctx)?;
                            self.tcsbs.remove(t_id);
                        }
                        self.rsbs.remove(rsb_id);
                    } else if !self.update_traffic_control(rsb_id, ctx)? {
                        warn!("{}: traffic control update failed during teardown", self.router);
                    }
                }
            }
            None => {
                // egress: drop the POP entry of this LSP
                let labels: Vec<Label> = ctx
                    .lib
                    .entries()
                    .iter()
                    .filter(|e| e.fec == msg.sender.lsp_id.0)
                    .map(|e| e.in_label)
                    .collect();
                for l in labels {
                    ctx.lib.remove(l)?;
                }
                signals.push(AppSignal::PathTearArrived(msg.clone()));
            }
        }
        self.psbs.remove(psb_id);
        Ok(signals)
    }

    fn process_resv_tear(
        &mut self,
        msg: ResvTearMsg,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let mut signals = Vec::new();
        debug!("{}: RESV TEAR for {} from {}", self.router, msg.session.dest, msg.hop.neighbor);
        let oi = match msg.hop.lih {
            Some(oi) => oi,
            None => return Err(DeviceError::NoMatchingPsb),
        };

        // learn the upstream next hop from the matching path state, then
        // drop it
        let mut phop: Option<RouterAddr> = None;
        let mut local_origin = false;
        for fd in &msg.flow_descriptors {
            let found = self
                .psbs
                .iter()
                .find(|(_, p)| p.sender == fd.filter && p.out_interface == Some(oi))
                .map(|(id, _)| id);
            if let Some(id) = found {
                if let Some(p) = self.psbs.get(id) {
                    if phop.is_none() {
                        phop = Some(p.phop);
                        local_origin = p.in_interface.is_none();
                    }
                }
                self.psbs.remove(id);
            }
        }

        let rsb_found = self
            .rsbs
            .iter()
            .find(|(_, r)| {
                msg.session.same_session(&r.session)
                    && r.next_hop == msg.hop.neighbor
                    && msg
                        .flow_descriptors
                        .iter()
                        .any(|fd| r.slot_of(&fd.filter).is_some())
            })
            .map(|(id, _)| id);
        let rsb_id = match rsb_found {
            Some(id) => id,
            None => {
                debug!("{}: cannot find matching RSB for RESV TEAR", self.router);
                return Ok(signals);
            }
        };
        let rsb = match self.rsbs.get(rsb_id) {
            Some(r) => r.clone(),
            None => return Ok(signals),
        };

        if local_origin {
            signals.push(AppSignal::ResvTearArrived(msg.clone()));
        } else if let Some(ph) = phop {
            // forward towards the sender before deleting local state
            let ted = ctx.ted.snapshot();
            let lih = ted.peer_interface(self.router, ph);
            let descriptors = rsb
                .filters
                .iter()
                .flatten()
                .map(|s| FlowDescriptor {
                    filter: s.filter,
                    flowspec: rsb.flowspec,
                    label: s.label,
                    rro: s.rro.clone(),
                })
                .collect();
            ctx.queue.push_back(Event::Rsvp(
                self.router,
                ph,
                RsvpMessage::ResvTear(ResvTearMsg {
                    session: msg.session,
                    hop: RsvpHop { neighbor: self.router, lih },
                    flow_descriptors: descriptors,
                }),
            ));
        }

        // release the reservation and drop the labels
        for slot in rsb.filters.iter().flatten() {
            if let Some(l) = slot.label {
                if ctx.lib.remove(l).is_err() {
                    warn!("{}: label {} already gone", self.router, l);
                }
            }
        }
        let t_found = self
            .tcsbs
            .iter()
            .find(|(_, t)| {
                t.session.same_session(&msg.session) && t.out_interface == rsb.out_interface
            })
            .map(|(id, t)| (id, t.rhandle));
        if let Some((t_id, handle)) = t_found {
            self.release_resource(handle, rsb.out_interface, ctx)?;
            self.tcsbs.remove(t_id);
        }
        self.rsbs.remove(rsb_id);
        Ok(signals)
    }

    fn process_path_err(
        &mut self,
        msg: PathErrMsg,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        let mut signals = Vec::new();
        debug!("{}: PATH ERROR ({:?}) from node {}", self.router, msg.error_code, msg.error_node);
        let found = self
            .psbs
            .iter()
            .find(|(_, p)| {
                msg.session.same_session(&p.session)
                    && p.sender.src == msg.sender.src
                    && p.sender.src_port == msg.sender.src_port
            })
            .map(|(id, _)| id);
        match found.and_then(|id| self.psbs.get(id)) {
            Some(p) if p.in_interface.is_none() => {
                signals.push(AppSignal::PathErrArrived(msg));
                Ok(signals)
            }
            Some(p) => {
                debug!("{}: propagating PATH ERROR towards {}", self.router, p.phop);
                let phop = p.phop;
                ctx.queue.push_back(Event::Rsvp(self.router, phop, RsvpMessage::PathErr(msg)));
                Ok(signals)
            }
            None => Err(DeviceError::NoMatchingPsb),
        }
    }

    fn process_resv_err(
        &mut self,
        msg: ResvErrMsg,
        ctx: &mut RsvpContext,
    ) -> Result<Vec<AppSignal>, DeviceError> {
        debug!("{}: RESV ERROR ({:?}) from node {}", self.router, msg.error_code, msg.error_node);
        if msg.session.dest == self.router {
            info!("{}: RESV ERROR reached the receiver", self.router);
            return Ok(Vec::new());
        }
        // travel towards the receiver along the recorded path state
        let next = self
            .psbs
            .iter()
            .find(|(_, p)| msg.session.same_session(&p.session))
            .and_then(|(_, p)| p.out_interface);
        let ted = ctx.ted.snapshot();
        match next.and_then(|oi| ted.peer_addr(self.router, oi)) {
            Some(peer) => {
                ctx.queue.push_back(Event::Rsvp(self.router, peer, RsvpMessage::ResvErr(msg)));
            }
            None => {
                debug!("{}: no downstream path state for RESV ERROR, dropping", self.router);
            }
        }
        Ok(Vec::new())
    }
}
