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

//! Test the make-before-break operator commands: route re-discovery and
//! bandwidth changes, both signaled under the doubled LSP id.

use crate::config::{Config, TrafficRequest};
use crate::lib_table::LabelOp;
use crate::network::Network;
use crate::types::{LspId, RouterAddr, RouterId, PRIORITY_LEVELS};
use lazy_static::lazy_static;

lazy_static! {
    static ref R1: RouterId = 0.into();
    static ref R2: RouterId = 1.into();
    static ref R3: RouterId = 2.into();
    static ref R4: RouterId = 3.into();
    static ref A1: RouterAddr = RouterAddr::nth(0);
    static ref A2: RouterAddr = RouterAddr::nth(1);
    static ref A3: RouterAddr = RouterAddr::nth(2);
    static ref A4: RouterAddr = RouterAddr::nth(3);
}

fn request(src: RouterAddr, dest: RouterAddr, bandwidth: f64) -> TrafficRequest {
    TrafficRequest {
        src,
        dest,
        setup_pri: 7,
        holding_pri: 7,
        delay: 0.0,
        bandwidth,
        explicit_route: true,
        route: Vec::new(),
    }
}

/// ```text
/// R1 --1-- R2 --1-- R4
///  \               /
///   `-5-- R3 --5--'
/// ```
fn square_net() -> Network {
    let mut net = Network::new();
    assert_eq!(*R1, net.add_router("R1"));
    assert_eq!(*R2, net.add_router("R2"));
    assert_eq!(*R3, net.add_router("R3"));
    assert_eq!(*R4, net.add_router("R4"));
    net.add_link(*R1, *R2, 1000.0, 1.0);
    net.add_link(*R2, *R4, 1000.0, 1.0);
    net.add_link(*R1, *R3, 1000.0, 5.0);
    net.add_link(*R3, *R4, 1000.0, 5.0);
    net.build_topology().unwrap();
    net
}

#[test]
fn test_route_rediscovery() {
    let mut net = square_net();
    let mut c = Config::new();
    c.add_request(request(*A1, *A4, 100.0)).unwrap();
    net.set_config(&c).unwrap();

    net.request_tunnel(*A1, *A4).unwrap();
    let r1 = net.get_router(*R1).unwrap();
    assert_eq!(r1.app().routes()[0].lsp_id, LspId(1));
    assert_eq!(r1.app().routes()[0].route, vec![*A1, *A2, *A4]);

    // no better route exists yet: the command is a no-op
    net.new_route_discover(*A1).unwrap();
    assert_eq!(net.get_router(*R1).unwrap().app().routes()[0].lsp_id, LspId(1));

    // the southern path becomes cheaper than the current route
    for (a, b) in [(*A1, *A3), (*A3, *A1), (*A3, *A4), (*A4, *A3)].iter() {
        net.ted_service_mut().update_link(*a, *b, 0.5, 1000.0);
    }
    net.new_route_discover(*A1).unwrap();
    assert_eq!(net.queue_len(), 0);

    // the reroute instance took over and the original LSP was torn down
    let r1 = net.get_router(*R1).unwrap();
    assert_eq!(r1.app().routes().len(), 1);
    assert_eq!(r1.app().routes()[0].lsp_id, LspId(1).reroute_twin());
    assert_eq!(r1.app().routes()[0].route, vec![*A1, *A3, *A4]);
    assert!(r1.app().tunnels()[0].operating);
    assert_eq!(r1.rsvp().psbs().len(), 1);
    assert_eq!(r1.lib().entries().len(), 1);
    assert_eq!(r1.lib().entries()[0].fec, LspId(1).reroute_twin().0);

    // the old transit hop is completely clean
    let r2 = net.get_router(*R2).unwrap();
    assert_eq!(r2.rsvp().psbs().len(), 0);
    assert!(r2.lib().entries().is_empty());
    assert_eq!(r2.rsvp().flow_table().len(), 0);

    // exactly one egress state pair remains
    let r4 = net.get_router(*R4).unwrap();
    assert_eq!(r4.rsvp().psbs().len(), 1);
    assert_eq!(r4.lib().entries().len(), 1);
    assert_eq!(r4.lib().entries()[0].ops[0], LabelOp::Pop);

    // the old path is fully credited, the new one is debited
    let ted = net.ted();
    assert_eq!(ted.link(*A1, *A2).unwrap().unreserved, [1000.0; PRIORITY_LEVELS]);
    assert_eq!(ted.link(*A2, *A4).unwrap().unreserved, [1000.0; PRIORITY_LEVELS]);
    assert_eq!(ted.link(*A1, *A3).unwrap().unreserved[7], 900.0);
    assert_eq!(ted.link(*A3, *A4).unwrap().unreserved[7], 900.0);
}

#[test]
fn test_bandwidth_change() {
    // linear net: the re-signaled LSP follows the same route with the new
    // Tspec, then replaces the original instance
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
    c.add_request(request(*A1, *A4, 100.0)).unwrap();
    net.set_config(&c).unwrap();
    net.request_tunnel(*A1, *A4).unwrap();

    net.new_bandwidth_request(*A1, *A4, 200.0).unwrap();
    assert_eq!(net.queue_len(), 0);

    // one LSP instance per router, now under the reroute id
    for r in [*R1, *R2, *R3, *R4].iter() {
        let router = net.get_router(*r).unwrap();
        assert_eq!(router.rsvp().psbs().len(), 1);
        assert_eq!(router.lib().entries().len(), 1);
        assert_eq!(router.lib().entries()[0].fec, LspId(1).reroute_twin().0);
    }

    // the reservation reflects the new bandwidth only
    let ted = net.ted();
    for (a, b) in [(*A1, *A2), (*A2, *A3), (*A3, *A4)].iter() {
        assert_eq!(ted.link(*a, *b).unwrap().unreserved[7], 800.0);
    }
    let r1 = net.get_router(*R1).unwrap();
    assert_eq!(r1.rsvp().flow_table().len(), 1);
    assert_eq!(r1.rsvp().flow_table()[0].reserved, 200.0);
    assert_eq!(r1.app().routes().len(), 1);
    assert_eq!(r1.app().routes()[0].lsp_id, LspId(1).reroute_twin());

    // changing the bandwidth of an unknown tunnel is silently ignored
    net.new_bandwidth_request(*A1, *A2, 50.0).unwrap();
    assert_eq!(net.queue_len(), 0);
}
