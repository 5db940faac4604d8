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

//! Test the traffic engineering database: seeding, lookups, the snapshot /
//! publish service contract, and link re-provisioning.

use crate::ted::{Ted, TedService, TeLink};
use crate::types::{InterfaceAddr, RouterAddr, PRIORITY_LEVELS};

fn two_link_ted() -> Ted {
    let a = RouterAddr::nth(0);
    let b = RouterAddr::nth(1);
    let ia = InterfaceAddr(1);
    let ib = InterfaceAddr(2);
    Ted {
        links: vec![
            TeLink::new(a, b, ia, ib, 1.0, 1000.0),
            TeLink::new(b, a, ib, ia, 1.0, 1000.0),
        ],
    }
}

#[test]
fn link_seeding() {
    let ted = two_link_ted();
    let link = ted.link(RouterAddr::nth(0), RouterAddr::nth(1)).unwrap();
    assert_eq!(link.max_bandwidth, 1000.0);
    assert_eq!(link.max_reservable, 1000.0);
    // every priority level starts at the reservable capacity
    assert_eq!(link.unreserved, [1000.0; PRIORITY_LEVELS]);
}

#[test]
fn lookups() {
    let ted = two_link_ted();
    let a = RouterAddr::nth(0);
    let b = RouterAddr::nth(1);
    assert_eq!(ted.local_interface(a, b), Some(InterfaceAddr(1)));
    assert_eq!(ted.peer_interface(a, b), Some(InterfaceAddr(2)));
    assert_eq!(ted.peer_addr(a, InterfaceAddr(1)), Some(b));
    assert_eq!(ted.link_by_local(b, InterfaceAddr(2)).map(|l| l.linkid), Some(a));
    assert_eq!(ted.neighbors(a), vec![b]);
    // unknown lookups yield nothing
    assert_eq!(ted.link(a, RouterAddr::nth(5)), None);
    assert_eq!(ted.peer_addr(a, InterfaceAddr(9)), None);
}

#[test]
fn snapshot_is_isolated() {
    let mut service = TedService::new(two_link_ted());
    let mut snapshot = service.snapshot();
    snapshot.links[0].unreserved[7] = 0.0;
    // the authoritative table is untouched until the snapshot is published
    assert_eq!(service.current().links[0].unreserved[7], 1000.0);
    service.publish(snapshot);
    assert_eq!(service.current().links[0].unreserved[7], 0.0);
}

#[test]
fn update_link_shifts_all_levels() {
    let mut service = TedService::new(two_link_ted());
    let a = RouterAddr::nth(0);
    let b = RouterAddr::nth(1);

    // simulate a partial reservation, then re-provision the link
    let mut ted = service.snapshot();
    for p in 3..PRIORITY_LEVELS {
        ted.links[0].unreserved[p] -= 100.0;
    }
    service.publish(ted);
    service.update_link(a, b, 2.0, 1500.0);

    let link = service.current().link(a, b).unwrap();
    assert_eq!(link.metric, 2.0);
    assert_eq!(link.max_bandwidth, 1500.0);
    assert_eq!(link.max_reservable, 1500.0);
    assert_eq!(link.unreserved[0], 1500.0);
    assert_eq!(link.unreserved[7], 1400.0);
    // the priority ordering invariant is preserved
    for p in 1..PRIORITY_LEVELS {
        assert!(link.unreserved[p] <= link.unreserved[p - 1]);
    }
}

#[test]
fn update_unknown_link_is_a_no_op() {
    let mut service = TedService::new(two_link_ted());
    let before = service.snapshot();
    service.update_link(RouterAddr::nth(5), RouterAddr::nth(6), 1.0, 10.0);
    assert_eq!(*service.current(), before);
}
