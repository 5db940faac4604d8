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

//! # Constrained Shortest Path First
//!
//! Dijkstra over a TED snapshot, pruning every link that cannot satisfy the
//! requested bandwidth at the request's setup priority. Candidate selection
//! ties are broken on the lowest router address, so equal-cost computations
//! are reproducible regardless of TED ordering.

use crate::messages::FlowSpec;
use crate::ted::Ted;
use crate::types::{Metric, RouterAddr};
use log::*;
use std::collections::HashSet;

/// Result of a route computation: the hops in forward order (the root is
/// excluded, the destination included) and the total path metric.
#[derive(Debug, Clone, PartialEq)]
pub struct CspfPath {
    /// Ordered hop list from the first hop after the root to the
    /// destination.
    pub hops: Vec<RouterAddr>,
    /// Sum of the link metrics along the path.
    pub metric: Metric,
}

/// Key identifying a directed link: (advertising router, neighbor).
pub type LinkKey = (RouterAddr, RouterAddr);

/// Vertex of the shortest-path computation. Parents are indices into the
/// settled list, never pointers, so the list may grow freely.
#[derive(Debug, Clone, Copy)]
struct Vertex {
    addr: RouterAddr,
    dist: Metric,
    parent: Option<usize>,
}

/// Compute an explicit route from `root` to `dest` satisfying the bandwidth
/// floor of `flowspec` at the given setup priority. Returns `None` when the
/// destination is unreachable under the constraint; never a partial path.
pub fn compute_ero(
    ted: &Ted,
    root: RouterAddr,
    dest: RouterAddr,
    flowspec: &FlowSpec,
    setup_pri: u8,
) -> Option<CspfPath> {
    build_route(ted, root, dest, |adv, linkid| {
        ted.link(adv, linkid)
            .map(|l| l.unreserved[setup_pri as usize] >= flowspec.bandwidth)
            .unwrap_or(false)
    })
}

/// Route re-optimization variant. A link in `links_in_use` already carries
/// the reservation being moved, so it is admitted when
/// `unreserved + old.bandwidth >= new.bandwidth` (the old reservation is
/// released before the new one is placed).
pub fn compute_ero_reopt(
    ted: &Ted,
    root: RouterAddr,
    dest: RouterAddr,
    links_in_use: &[LinkKey],
    old_flowspec: &FlowSpec,
    new_flowspec: &FlowSpec,
    setup_pri: u8,
) -> Option<CspfPath> {
    build_route(ted, root, dest, |adv, linkid| {
        ted.link(adv, linkid)
            .map(|l| {
                let mut available = l.unreserved[setup_pri as usize];
                if links_in_use.contains(&(adv, linkid)) {
                    available += old_flowspec.bandwidth;
                }
                available >= new_flowspec.bandwidth
            })
            .unwrap_or(false)
    })
}

/// Shared shortest-path tree construction. `admit` decides whether a
/// directed link may be used.
fn build_route<F>(ted: &Ted, root: RouterAddr, dest: RouterAddr, admit: F) -> Option<CspfPath>
where
    F: Fn(RouterAddr, RouterAddr) -> bool,
{
    let mut tree: Vec<Vertex> = Vec::new();
    let mut settled: HashSet<RouterAddr> = HashSet::new();
    let mut candidates: Vec<Vertex> = vec![Vertex { addr: root, dist: 0.0, parent: None }];

    while !candidates.is_empty() {
        // pop the candidate with minimum cumulative distance; ties are
        // broken on the lowest router address
        let best = candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.dist.partial_cmp(&b.dist).unwrap().then(a.addr.cmp(&b.addr))
            })
            .map(|(i, _)| i)
            .unwrap();
        let vertex = candidates.swap_remove(best);
        let vertex_idx = tree.len();
        settled.insert(vertex.addr);
        tree.push(vertex);

        // relax all TED neighbors that satisfy the constraint
        for link in ted.links.iter().filter(|l| l.advrouter == vertex.addr) {
            if settled.contains(&link.linkid) || !admit(link.advrouter, link.linkid) {
                continue;
            }
            let dist = vertex.dist + link.metric;
            match candidates.iter_mut().find(|c| c.addr == link.linkid) {
                Some(cand) => {
                    let shorter = dist < cand.dist;
                    // on equal distance, prefer the parent with the lower
                    // address, keeping the result scan-order independent
                    let tie = dist == cand.dist
                        && cand.parent.map(|p| vertex.addr < tree[p].addr).unwrap_or(false);
                    if shorter || tie {
                        cand.dist = dist;
                        cand.parent = Some(vertex_idx);
                    }
                }
                None => {
                    candidates.push(Vertex {
                        addr: link.linkid,
                        dist,
                        parent: Some(vertex_idx),
                    });
                }
            }
        }
    }

    // reconstruct the path by walking the parent indices back from the
    // destination
    let dest_vertex = tree.iter().find(|v| v.addr == dest)?;
    let mut hops = Vec::new();
    let mut current = dest_vertex;
    loop {
        hops.push(current.addr);
        match current.parent {
            Some(p) => current = &tree[p],
            None => break,
        }
    }
    // the last pushed vertex is the root; drop it and restore forward order
    hops.pop();
    hops.reverse();

    trace!("route {} -> {}: {:?} (metric {})", root, dest, hops, dest_vertex.dist);
    Some(CspfPath { hops, metric: dest_vertex.dist })
}
