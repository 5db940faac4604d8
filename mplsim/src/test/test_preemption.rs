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

//! Test reservation with preemption: a stronger request tears weaker
//! reservations down, and never touches reservations at least as strong as
//! its own setup priority.

use crate::config::{Config, TrafficRequest};
use crate::network::Network;
use crate::types::{Bandwidth, RouterAddr, RouterId, PRIORITY_LEVELS};
use lazy_static::lazy_static;

lazy_static! {
    static ref R1: RouterId = 0.into();
    static ref R2: RouterId = 1.into();
    static ref R3: RouterId = 2.into();
    static ref R4: RouterId = 3.into();
    static ref R5: RouterId = 4.into();
    static ref A1: RouterAddr = RouterAddr::nth(0);
    static ref A2: RouterAddr = RouterAddr::nth(1);
    static ref A3: RouterAddr = RouterAddr::nth(2);
    static ref A4: RouterAddr = RouterAddr::nth(3);
    static ref A5: RouterAddr = RouterAddr::nth(4);
}

fn request(
    src: RouterAddr,
    dest: RouterAddr,
    bandwidth: Bandwidth,
    setup_pri: u8,
    holding_pri: u8,
) -> TrafficRequest {
    TrafficRequest {
        src,
        dest,
        setup_pri,
        holding_pri,
        delay: 0.0,
        bandwidth,
        explicit_route: true,
        route: Vec::new(),
    }
}

#[test]
fn test_preemption_of_weaker_tunnel() {
    // linear net R1 -- R2 -- R3 -- R4; tunnel A (R1 -> R3, weak) and
    // tunnel B (R1 -> R4, strong) contend on the first two links
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    assert_eq!(*R3, net.add_router("R3"));
    assert_eq!(*R4, net.add_router("R4"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.add_link(*R2, *R3, 1000.0, 1.0);
    net.add_link(*R3, *R4, 1000.0, 1.0);
    net.build_topology().unwrap();
    let mut c = Config::new();
    c.add_request(request(*A1, *A3, 600.0, 7, 7)).unwrap();
    c.add_request(request(*A1, *A4, 600.0, 0, 0)).unwrap();
    net.set_config(&c).unwrap();

    net.request_tunnel(*A1, *A3).unwrap();
    assert_eq!(net.ted().link(*A1, *A2).unwrap().unreserved[7], 400.0);
    assert_eq!(net.ted().link(*A2, *A3).unwrap().unreserved[7], 400.0);

    // tunnel B does not fit next to A, so A is preempted along the way
    net.request_tunnel(*A1, *A4).unwrap();
    assert_eq!(net.queue_len(), 0);

    let ted = net.ted();
    for (a, b) in [(*A1, *A2), (*A2, *A3), (*A3, *A4)].iter() {
        let link = ted.link(*a, *b).unwrap();
        // only B's reservation is left, debited at every level
        assert_eq!(link.unreserved, [400.0; PRIORITY_LEVELS]);
    }

    // A is gone everywhere: one LIB entry per router, all belonging to B
    for r in [*R1, *R2, *R3, *R4].iter() {
        let router = net.get_router(*r).unwrap();
        assert_eq!(router.lib().entries().len(), 1);
        assert_eq!(router.lib().entries()[0].fec, 2);
    }
    let r2 = net.get_router(*R2).unwrap();
    assert_eq!(r2.rsvp().flow_table().len(), 1);
    assert_eq!(r2.rsvp().flow_table()[0].holding_pri, 0);

    // the head end saw the PATH TEAR / RESV TEAR pair for A
    let app = net.get_router(*R1).unwrap().app();
    assert!(!app.tunnels()[0].operating);
    assert!(app.tunnels()[1].operating);
    assert_eq!(app.routes().len(), 1);
    assert_eq!(app.routes()[0].route, vec![*A1, *A2, *A3, *A4]);
}

#[test]
fn test_preemption_respects_setup_priority() {
    // star around R2: three tunnels from R1 share the link R1 -> R2.
    // A (holding 3) is stronger than B's setup priority 5 and must survive;
    // C (holding 7) is weaker and is the only preemption victim.
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    assert_eq!(*R3, net.add_router("R3"));
    assert_eq!(*R4, net.add_router("R4"));
    assert_eq!(*R5, net.add_router("R5"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.add_link(*R2, *R3, 1000.0, 1.0);
    net.add_link(*R2, *R4, 1000.0, 1.0);
    net.add_link(*R2, *R5, 1000.0, 1.0);
    net.build_topology().unwrap();
    let mut c = Config::new();
    c.add_request(request(*A1, *A3, 500.0, 3, 3)).unwrap();
    c.add_request(request(*A1, *A4, 300.0, 7, 7)).unwrap();
    c.add_request(request(*A1, *A5, 400.0, 5, 5)).unwrap();
    net.set_config(&c).unwrap();

    net.request_tunnel(*A1, *A3).unwrap();
    net.request_tunnel(*A1, *A4).unwrap();
    let shared = net.ted().link(*A1, *A2).unwrap();
    assert_eq!(shared.unreserved[2], 1000.0);
    assert_eq!(shared.unreserved[3], 500.0);
    assert_eq!(shared.unreserved[7], 200.0);

    net.request_tunnel(*A1, *A5).unwrap();
    assert_eq!(net.queue_len(), 0);

    let shared = net.ted().link(*A1, *A2).unwrap();
    assert_eq!(shared.unreserved[2], 1000.0);
    // A's debit at levels 3 and 4 is untouched
    assert_eq!(shared.unreserved[3], 500.0);
    assert_eq!(shared.unreserved[4], 500.0);
    // C's debit is gone, B's is in place
    assert_eq!(shared.unreserved[5], 100.0);
    assert_eq!(shared.unreserved[7], 100.0);

    // the flow table holds A and B, and C's stub link is fully released
    let handles: Vec<u32> = net
        .get_router(*R1)
        .unwrap()
        .rsvp()
        .flow_table()
        .iter()
        .map(|e| e.handle)
        .collect();
    assert_eq!(handles, vec![1, 3]);
    assert_eq!(net.ted().link(*A2, *A4).unwrap().unreserved, [1000.0; PRIORITY_LEVELS]);
    assert!(net.get_router(*R4).unwrap().lib().entries().is_empty());
}

#[test]
fn test_no_preemption_of_equal_priority() {
    // A (holding 2) and B (setup 2) contend on R1 -> R2: equal priority is
    // never preempted, so B is denied at admission control
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    assert_eq!(*R3, net.add_router("R3"));
    assert_eq!(*R4, net.add_router("R4"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.add_link(*R2, *R3, 1000.0, 1.0);
    net.add_link(*R2, *R4, 1000.0, 1.0);
    net.build_topology().unwrap();
    let mut c = Config::new();
    c.add_request(request(*A1, *A3, 500.0, 2, 2)).unwrap();
    let mut contender = request(*A1, *A4, 550.0, 2, 2);
    contender.explicit_route = false;
    c.add_request(contender).unwrap();
    net.set_config(&c).unwrap();

    net.request_tunnel(*A1, *A3).unwrap();
    let before = net.ted().clone();

    net.request_tunnel(*A1, *A4).unwrap();
    assert_eq!(net.queue_len(), 0);

    // B was rejected, A is untouched
    assert_eq!(*net.ted(), before);
    let app = net.get_router(*R1).unwrap().app();
    assert!(app.tunnels()[0].operating);
    assert!(!app.tunnels()[1].operating);
    assert_eq!(net.get_router(*R1).unwrap().rsvp().flow_table().len(), 1);
}
