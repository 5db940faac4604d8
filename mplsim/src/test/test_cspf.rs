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

//! Test the constrained shortest path computation on hand-built TEDs.

use crate::cspf::{compute_ero, compute_ero_reopt};
use crate::messages::FlowSpec;
use crate::ted::{Ted, TeLink};
use crate::types::{Bandwidth, InterfaceAddr, Metric, RouterAddr};
use lazy_static::lazy_static;

lazy_static! {
    static ref A1: RouterAddr = RouterAddr::nth(0);
    static ref A2: RouterAddr = RouterAddr::nth(1);
    static ref A3: RouterAddr = RouterAddr::nth(2);
    static ref A4: RouterAddr = RouterAddr::nth(3);
}

fn link(a: RouterAddr, b: RouterAddr, metric: Metric, bandwidth: Bandwidth) -> TeLink {
    // interface addresses are irrelevant for route computation
    TeLink::new(a, b, InterfaceAddr(0), InterfaceAddr(0), metric, bandwidth)
}

/// ```text
/// A1 --1-- A2 --1-- A4
///  \               /
///   `-5-- A3 --5--'
/// ```
fn square_ted() -> Ted {
    Ted {
        links: vec![
            link(*A1, *A2, 1.0, 1000.0),
            link(*A2, *A1, 1.0, 1000.0),
            link(*A2, *A4, 1.0, 1000.0),
            link(*A4, *A2, 1.0, 1000.0),
            link(*A1, *A3, 5.0, 1000.0),
            link(*A3, *A1, 5.0, 1000.0),
            link(*A3, *A4, 5.0, 1000.0),
            link(*A4, *A3, 5.0, 1000.0),
        ],
    }
}

/// The returned path only uses links with enough unreserved bandwidth at
/// the setup priority.
fn assert_feasible(ted: &Ted, root: RouterAddr, hops: &[RouterAddr], fs: &FlowSpec, pri: u8) {
    let mut at = root;
    for hop in hops {
        let link = ted.link(at, *hop).expect("path uses a link not in the TED");
        assert!(link.unreserved[pri as usize] >= fs.bandwidth);
        at = *hop;
    }
}

#[test]
fn shortest_path_by_metric() {
    let ted = square_ted();
    let fs = FlowSpec::new(100.0, 0.0);
    let path = compute_ero(&ted, *A1, *A4, &fs, 7).unwrap();
    assert_eq!(path.hops, vec![*A2, *A4]);
    assert_eq!(path.metric, 2.0);
    assert_feasible(&ted, *A1, &path.hops, &fs, 7);
}

#[test]
fn bandwidth_constraint_forces_detour() {
    let mut ted = square_ted();
    // the cheap link A2 -> A4 has no capacity left at priority 7
    ted.links[2].unreserved[7] = 50.0;
    let fs = FlowSpec::new(100.0, 0.0);
    let path = compute_ero(&ted, *A1, *A4, &fs, 7).unwrap();
    assert_eq!(path.hops, vec![*A3, *A4]);
    assert_eq!(path.metric, 10.0);
    assert_feasible(&ted, *A1, &path.hops, &fs, 7);
    // at a stronger priority the cheap path is still admissible
    let path = compute_ero(&ted, *A1, *A4, &fs, 0).unwrap();
    assert_eq!(path.hops, vec![*A2, *A4]);
}

#[test]
fn no_feasible_route_is_none() {
    let mut ted = square_ted();
    // both links into A4 are out of capacity: no path, never a partial one
    ted.links[2].unreserved[7] = 0.0;
    ted.links[6].unreserved[7] = 0.0;
    let fs = FlowSpec::new(100.0, 0.0);
    assert_eq!(compute_ero(&ted, *A1, *A4, &fs, 7), None);
    // an unknown destination is unreachable as well
    assert_eq!(compute_ero(&ted, *A1, RouterAddr::nth(9), &fs, 7), None);
}

#[test]
fn equal_cost_tie_break_is_deterministic() {
    // two equal-cost paths A1 -> A2 -> A4 and A1 -> A3 -> A4; the tie is
    // broken on the lowest router address, independent of the scan order
    let mut ted = Ted {
        links: vec![
            link(*A1, *A2, 1.0, 1000.0),
            link(*A2, *A4, 1.0, 1000.0),
            link(*A1, *A3, 1.0, 1000.0),
            link(*A3, *A4, 1.0, 1000.0),
        ],
    };
    let fs = FlowSpec::new(10.0, 0.0);
    let path = compute_ero(&ted, *A1, *A4, &fs, 7).unwrap();
    assert_eq!(path.hops, vec![*A2, *A4]);
    ted.links.reverse();
    let path = compute_ero(&ted, *A1, *A4, &fs, 7).unwrap();
    assert_eq!(path.hops, vec![*A2, *A4]);
}

#[test]
fn reoptimization_credits_links_in_use() {
    let mut ted = square_ted();
    // the current LSP occupies the cheap path entirely, and the expensive
    // path is saturated by someone else
    ted.links[0].unreserved[7] = 0.0;
    ted.links[2].unreserved[7] = 0.0;
    ted.links[6].unreserved[7] = 0.0;
    let old = FlowSpec::new(1000.0, 0.0);
    let new = FlowSpec::new(1000.0, 0.0);

    // without the in-use credit, not even A2 is reachable
    assert_eq!(compute_ero(&ted, *A1, *A4, &new, 7), None);

    // releasing the old reservation first makes the same path viable again
    let in_use = vec![(*A1, *A2), (*A2, *A4)];
    let path = compute_ero_reopt(&ted, *A1, *A4, &in_use, &old, &new, 7).unwrap();
    assert_eq!(path.hops, vec![*A2, *A4]);

    // a grown reservation no longer fits on the old links
    let grown = FlowSpec::new(1200.0, 0.0);
    assert_eq!(compute_ero_reopt(&ted, *A1, *A4, &in_use, &old, &grown, 7), None);
}
