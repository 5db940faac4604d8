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

//! Test the LDP engine: discovery with the deterministic connect-role
//! tie-break, and hop-by-hop label distribution.

use crate::event::{Event, EventQueue};
use crate::ldp::{LdpContext, LdpProcess, LdpSessionState};
use crate::lib_table::{LabelOp, LibTable};
use crate::messages::{LdpMessage, TransportEvent};
use crate::network::Network;
use crate::ted::{Ted, TeLink};
use crate::types::{InterfaceAddr, RouterAddr, RouterId};
use lazy_static::lazy_static;
use maplit::hashmap;

lazy_static! {
    static ref R1: RouterId = 0.into();
    static ref R2: RouterId = 1.into();
    static ref R3: RouterId = 2.into();
    static ref A1: RouterAddr = RouterAddr::nth(0);
    static ref A2: RouterAddr = RouterAddr::nth(1);
    static ref A3: RouterAddr = RouterAddr::nth(2);
}

#[test]
fn test_discovery_tie_break() {
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.build_topology().unwrap();

    net.start_ldp().unwrap();
    assert_eq!(net.queue_len(), 0);

    // exactly one session: 10.0.0.2 (the larger address) opened it
    let p1 = net.get_router(*R1).unwrap().ldp().peer(*A2).unwrap().clone();
    let p2 = net.get_router(*R2).unwrap().ldp().peer(*A1).unwrap().clone();
    assert_eq!(net.get_router(*R1).unwrap().ldp().peers().len(), 1);
    assert_eq!(net.get_router(*R2).unwrap().ldp().peers().len(), 1);
    assert!(!p1.active_role);
    assert!(p2.active_role);
    assert_eq!(p1.state, LdpSessionState::Operational);
    assert_eq!(p2.state, LdpSessionState::Operational);
}

#[test]
fn test_label_distribution_along_chain() {
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    assert_eq!(*R3, net.add_router("R3"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.add_link(*R2, *R3, 1000.0, 1.0);
    net.build_topology().unwrap();
    net.start_ldp().unwrap();

    net.ldp_request_label(*A1, *A3).unwrap();
    assert_eq!(net.queue_len(), 0);

    // PUSH at the ingress (classified by FEC, no incoming interface)
    let lib1 = net.get_router(*R1).unwrap().lib();
    assert_eq!(lib1.entries().len(), 1);
    assert_eq!(lib1.entries()[0].in_interface, None);
    assert_eq!(lib1.entries()[0].fec, A3.0);
    assert!(matches!(lib1.entries()[0].ops[0], LabelOp::Push(_)));
    assert!(lib1.resolve_fec(A3.0).is_some());

    // SWAP at the transit hop, wired between both interfaces
    let lib2 = net.get_router(*R2).unwrap().lib();
    assert_eq!(lib2.entries().len(), 1);
    let entry = &lib2.entries()[0];
    let ted = net.ted();
    assert_eq!(entry.in_interface, ted.local_interface(*A2, *A1));
    assert_eq!(entry.out_interface, ted.local_interface(*A2, *A3));
    assert!(matches!(entry.ops[0], LabelOp::Swap(_)));

    // POP at the egress
    let lib3 = net.get_router(*R3).unwrap().lib();
    assert_eq!(lib3.entries().len(), 1);
    assert_eq!(lib3.entries()[0].ops[0], LabelOp::Pop);
    assert_eq!(lib3.entries()[0].out_interface, None);

    // the transit SWAP points at the label the egress advertised
    let egress_label = lib3.entries()[0].in_label;
    assert_eq!(entry.ops[0], LabelOp::Swap(egress_label));
    // and the ingress PUSH points at the transit label
    assert_eq!(lib1.entries()[0].ops[0], LabelOp::Push(entry.in_label));
}

// ------------------
// Single-engine tests: one router M between an upstream neighbor U and a
// downstream neighbor D.
// ------------------

struct LdpTransit {
    ldp: LdpProcess,
    ted: Ted,
    lib: LibTable,
    igp: crate::types::IgpTable,
    queue: EventQueue,
    u: RouterAddr,
    m: RouterAddr,
    d: RouterAddr,
}

impl LdpTransit {
    fn new() -> Self {
        let u = *A1;
        let m = *A2;
        let d = *A3;
        let ted = Ted {
            links: vec![
                TeLink::new(u, m, InterfaceAddr(1), InterfaceAddr(2), 1.0, 1000.0),
                TeLink::new(m, u, InterfaceAddr(2), InterfaceAddr(1), 1.0, 1000.0),
                TeLink::new(m, d, InterfaceAddr(3), InterfaceAddr(4), 1.0, 1000.0),
                TeLink::new(d, m, InterfaceAddr(4), InterfaceAddr(3), 1.0, 1000.0),
            ],
        };
        Self {
            ldp: LdpProcess::new(m),
            ted,
            lib: LibTable::new(),
            igp: hashmap! {
                u => Some((u, 1.0)),
                d => Some((d, 1.0)),
            },
            queue: EventQueue::new(),
            u,
            m,
            d,
        }
    }

    fn process(&mut self, from: RouterAddr, msg: LdpMessage) {
        let mut ctx = LdpContext {
            ted: &self.ted,
            lib: &mut self.lib,
            igp: &self.igp,
            queue: &mut self.queue,
        };
        self.ldp.process(from, msg, &mut ctx).unwrap();
    }

    fn transport(&mut self, from: RouterAddr, ev: TransportEvent) {
        let mut ctx = LdpContext {
            ted: &self.ted,
            lib: &mut self.lib,
            igp: &self.igp,
            queue: &mut self.queue,
        };
        self.ldp.process_transport(from, ev, &mut ctx);
    }

    /// Bring both adjacencies to Operational.
    fn establish(&mut self) {
        let (u, d) = (self.u, self.d);
        self.process(u, LdpMessage::Hello);
        self.process(d, LdpMessage::Hello);
        // M connects to U (larger address), D connects to M
        self.transport(u, TransportEvent::SynAck);
        self.transport(d, TransportEvent::Syn);
        assert_eq!(self.ldp.peer(u).unwrap().state, LdpSessionState::Operational);
        assert_eq!(self.ldp.peer(d).unwrap().state, LdpSessionState::Operational);
    }
}

#[test]
fn test_role_assignment_per_peer() {
    let mut t = LdpTransit::new();
    let (u, d) = (t.u, t.d);
    t.process(u, LdpMessage::Hello);
    t.process(d, LdpMessage::Hello);
    // M has the larger address than U, the smaller one than D
    assert!(t.ldp.peer(u).unwrap().active_role);
    assert!(!t.ldp.peer(d).unwrap().active_role);
    assert_eq!(t.ldp.peer(u).unwrap().state, LdpSessionState::AwaitingEstab);
    assert_eq!(t.ldp.peer(d).unwrap().state, LdpSessionState::AwaitingSyn);
    // a Syn is only acknowledged on the passive side
    let syns = t
        .queue
        .iter()
        .filter(|e| matches!(e, Event::LdpTransport(_, _, TransportEvent::Syn)))
        .count();
    assert_eq!(syns, 1);
}

#[test]
fn test_duplicate_label_request_is_ignored() {
    let mut t = LdpTransit::new();
    t.establish();
    let (u, d) = (t.u, t.d);

    t.process(u, LdpMessage::LabelRequest { fec: d });
    let queued = t.queue.len();
    // the second identical request must not be forwarded again
    t.process(u, LdpMessage::LabelRequest { fec: d });
    assert_eq!(t.queue.len(), queued);

    // the mapping reply answers the one pending request
    t.process(d, LdpMessage::LabelMapping { fec: d, label: 7 });
    assert_eq!(t.lib.entries().len(), 1);
    assert_eq!(t.lib.entries()[0].ops[0], LabelOp::Swap(7));
    match t.queue.back() {
        Some(Event::Ldp(_, to, LdpMessage::LabelMapping { fec, label })) => {
            assert_eq!(*to, u);
            assert_eq!(*fec, d);
            assert_eq!(*label, t.lib.entries()[0].in_label);
        }
        e => panic!("expected a relayed mapping towards the upstream peer, got {:?}", e),
    }
}

#[test]
fn test_unknown_peer_events_are_dropped() {
    let mut t = LdpTransit::new();
    t.establish();
    let stranger = RouterAddr::nth(9);
    // a transport event from an unknown peer is refused without state change
    t.transport(stranger, TransportEvent::Syn);
    assert_eq!(t.ldp.peers().len(), 2);
    // a local request towards a destination with no route is dropped
    let queued = t.queue.len();
    let mut ctx = LdpContext {
        ted: &t.ted,
        lib: &mut t.lib,
        igp: &t.igp,
        queue: &mut t.queue,
    };
    t.ldp.request_label(stranger, &mut ctx);
    assert_eq!(t.queue.len(), queued);
}
