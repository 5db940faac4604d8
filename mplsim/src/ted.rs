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

//! # Traffic Engineering Database
//!
//! Process-wide table of directed links, each carrying static capacity and a
//! per-priority array of unreserved bandwidth. The authoritative copy lives
//! in a [`TedService`]; every message handler works on a private
//! [`snapshot`](TedService::snapshot) and publishes mutations back as a
//! whole-table replace, so a handler mid-computation never observes a
//! concurrent admission change.

use crate::types::{Bandwidth, InterfaceAddr, Metric, RouterAddr, PRIORITY_LEVELS};
use log::*;

/// One directed link record.
///
/// Invariant: `unreserved[7] <= ... <= unreserved[0] <= max_bandwidth`.
/// `unreserved[p]` is the bandwidth available to a request with setup
/// priority `p`; a reservation with holding priority `h` is debited at all
/// levels `p >= h`, so `unreserved[7]` is the actual residual capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct TeLink {
    /// Advertising router
    pub advrouter: RouterAddr,
    /// Link id: the neighbor's router address
    pub linkid: RouterAddr,
    /// Local interface address (on the advertising router)
    pub local: InterfaceAddr,
    /// Remote interface address (on the neighbor)
    pub remote: InterfaceAddr,
    /// Link metric, used as propagation delay
    pub metric: Metric,
    /// Physical link bandwidth
    pub max_bandwidth: Bandwidth,
    /// Maximum reservable bandwidth
    pub max_reservable: Bandwidth,
    /// Unreserved bandwidth per priority level
    pub unreserved: [Bandwidth; PRIORITY_LEVELS],
}

impl TeLink {
    /// New link record with all unreserved levels seeded at the reservable
    /// capacity.
    pub fn new(
        advrouter: RouterAddr,
        linkid: RouterAddr,
        local: InterfaceAddr,
        remote: InterfaceAddr,
        metric: Metric,
        bandwidth: Bandwidth,
    ) -> Self {
        Self {
            advrouter,
            linkid,
            local,
            remote,
            metric,
            max_bandwidth: bandwidth,
            max_reservable: bandwidth,
            unreserved: [bandwidth; PRIORITY_LEVELS],
        }
    }
}

/// The link-state table, with the lookups the signaling engines need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ted {
    /// All directed link records
    pub links: Vec<TeLink>,
}

impl Ted {
    /// Find the link advertised by `advrouter` towards `linkid`.
    pub fn link(&self, advrouter: RouterAddr, linkid: RouterAddr) -> Option<&TeLink> {
        self.links.iter().find(|l| l.advrouter == advrouter && l.linkid == linkid)
    }

    /// Find the link advertised by `advrouter` with the given local
    /// interface address.
    pub fn link_by_local(&self, advrouter: RouterAddr, local: InterfaceAddr) -> Option<&TeLink> {
        self.links.iter().find(|l| l.advrouter == advrouter && l.local == local)
    }

    /// Mutable variant of [`Ted::link_by_local`].
    pub fn link_by_local_mut(
        &mut self,
        advrouter: RouterAddr,
        local: InterfaceAddr,
    ) -> Option<&mut TeLink> {
        self.links.iter_mut().find(|l| l.advrouter == advrouter && l.local == local)
    }

    /// Address of the peer reachable over the given local interface.
    pub fn peer_addr(&self, advrouter: RouterAddr, local: InterfaceAddr) -> Option<RouterAddr> {
        self.link_by_local(advrouter, local).map(|l| l.linkid)
    }

    /// The peer's interface address on the link from `advrouter` to `peer`.
    pub fn peer_interface(&self, advrouter: RouterAddr, peer: RouterAddr) -> Option<InterfaceAddr> {
        self.link(advrouter, peer).map(|l| l.remote)
    }

    /// The local interface address of the link from `advrouter` to `peer`.
    pub fn local_interface(&self, advrouter: RouterAddr, peer: RouterAddr) -> Option<InterfaceAddr> {
        self.link(advrouter, peer).map(|l| l.local)
    }

    /// All neighbors of the given router, in table order.
    pub fn neighbors(&self, advrouter: RouterAddr) -> Vec<RouterAddr> {
        self.links.iter().filter(|l| l.advrouter == advrouter).map(|l| l.linkid).collect()
    }
}

/// Owner of the authoritative TED.
///
/// Engines hold no reference to the table itself: they take a snapshot per
/// message-handling turn and publish whole-table updates.
#[derive(Debug, Clone, Default)]
pub struct TedService {
    ted: Ted,
}

impl TedService {
    /// New service around an already-built table.
    pub fn new(ted: Ted) -> Self {
        Self { ted }
    }

    /// A private copy for one message-handling turn.
    pub fn snapshot(&self) -> Ted {
        self.ted.clone()
    }

    /// Read access without copying (for tests and state inspection).
    pub fn current(&self) -> &Ted {
        &self.ted
    }

    /// Replace the table wholesale. Visible to subsequently-scheduled
    /// handlers, never to one already mid-computation.
    pub fn publish(&mut self, ted: Ted) {
        self.ted = ted;
    }

    /// Re-provision a link: adjust the metric, and shift all unreserved
    /// levels by the difference between the new and the old capacity.
    /// An unknown link is a logged no-op.
    pub fn update_link(
        &mut self,
        advrouter: RouterAddr,
        linkid: RouterAddr,
        metric: Metric,
        bandwidth: Bandwidth,
    ) {
        match self.ted.links.iter_mut().find(|l| l.advrouter == advrouter && l.linkid == linkid) {
            Some(link) => {
                let delta = bandwidth - link.max_bandwidth;
                link.metric = metric;
                link.max_bandwidth = bandwidth;
                link.max_reservable += delta;
                for level in link.unreserved.iter_mut() {
                    *level += delta;
                }
                debug!(
                    "updated link ({}, {}): metric={}, capacity delta={}",
                    advrouter, linkid, metric, delta
                );
            }
            None => warn!("update_link: link ({}, {}) not found", advrouter, linkid),
        }
    }
}
