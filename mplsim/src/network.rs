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

//! # Top-level Network module
//!
//! This module represents the network topology, builds the traffic
//! engineering database from it, and simulates the signaling: every public
//! operation enqueues events and then drains the queue, delivering each
//! event to its target router in FIFO order.

use crate::config::Config;
use crate::event::EventQueue;
use crate::router::Router;
use crate::ted::{Ted, TedService, TeLink};
use crate::types::{
    Bandwidth, IgpNetwork, InterfaceAddr, Metric, NetworkError, RouterAddr, RouterId,
};
use log::*;
use std::collections::HashMap;

static DEFAULT_STOP_AFTER: usize = 10_000;

/// # Network struct
///
/// The struct contains all information about the underlying physical
/// network (links), manages all routers, and handles all events between
/// them. Every handler runs to completion as the reaction to one delivered
/// message; messages are delivered strictly in enqueue order.
#[derive(Debug, Clone)]
pub struct Network {
    net: IgpNetwork,
    links: Vec<(RouterId, RouterId, Bandwidth, Metric)>,
    routers: HashMap<RouterId, Router>,
    addr_to_id: HashMap<RouterAddr, RouterId>,
    id_to_addr: HashMap<RouterId, RouterAddr>,
    ted: TedService,
    queue: EventQueue,
    stop_after: Option<usize>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Generate an empty Network
    pub fn new() -> Self {
        Self {
            net: IgpNetwork::new(),
            links: Vec::new(),
            routers: HashMap::new(),
            addr_to_id: HashMap::new(),
            id_to_addr: HashMap::new(),
            ted: TedService::default(),
            queue: EventQueue::new(),
            stop_after: Some(DEFAULT_STOP_AFTER),
        }
    }

    /// Add a new router to the topology. Addresses are assigned in
    /// insertion order (10.0.0.1, 10.0.0.2, ...). This function returns
    /// the ID of the router, which can be used to reference it while
    /// building the network.
    pub fn add_router<S: Into<String>>(&mut self, name: S) -> RouterId {
        let addr = RouterAddr::nth(self.routers.len());
        let router_id = self.net.add_node(());
        let new_router = Router::new(name.into(), router_id, addr);
        self.routers.insert(router_id, new_router);
        self.addr_to_id.insert(addr, router_id);
        self.id_to_addr.insert(router_id, addr);
        router_id
    }

    /// Create a bidirectional link between the two routers, with the given
    /// capacity and propagation delay (used as the link metric) in both
    /// directions.
    pub fn add_link(&mut self, source: RouterId, target: RouterId, bandwidth: Bandwidth, delay: Metric) {
        self.links.push((source, target, bandwidth, delay));
        self.net.add_edge(source, target, delay);
        self.net.add_edge(target, source, delay);
    }

    /// Build the traffic engineering database and the IGP forwarding
    /// tables from the topology. Call this once after all routers and
    /// links are added (and again after re-provisioning).
    pub fn build_topology(&mut self) -> Result<(), NetworkError> {
        let mut ted = Ted::default();
        let mut iface = 0u32;
        let iface_addr = |n: &mut u32| {
            *n += 1;
            InterfaceAddr(0xc0a8_0000 + *n)
        };
        for (a, b, bandwidth, delay) in self.links.iter() {
            let addr_a = *self.id_to_addr.get(a).ok_or(NetworkError::DeviceNotFound(*a))?;
            let addr_b = *self.id_to_addr.get(b).ok_or(NetworkError::DeviceNotFound(*b))?;
            let local_a = iface_addr(&mut iface);
            let local_b = iface_addr(&mut iface);
            ted.links.push(TeLink::new(addr_a, addr_b, local_a, local_b, *delay, *bandwidth));
            ted.links.push(TeLink::new(addr_b, addr_a, local_b, local_a, *delay, *bandwidth));
        }
        debug!("built TED with {} directed link records", ted.links.len());
        self.ted.publish(ted);
        for router in self.routers.values_mut() {
            router.write_igp_forwarding_table(&self.net, &self.id_to_addr);
        }
        Ok(())
    }

    /// Apply a static configuration: register every traffic request with
    /// its head-end router and install the pre-provisioned LIB entries.
    pub fn set_config(&mut self, config: &Config) -> Result<(), NetworkError> {
        for request in &config.requests {
            request.validate()?;
            let id = self
                .addr_to_id
                .get(&request.src)
                .ok_or(NetworkError::DeviceAddrNotFound(request.src))?;
            if let Some(router) = self.routers.get_mut(id) {
                router.add_traffic_request(request.clone());
            }
        }
        for entry in &config.lib_entries {
            let id = self
                .addr_to_id
                .get(&entry.router)
                .ok_or(NetworkError::DeviceAddrNotFound(entry.router))?;
            if let Some(router) = self.routers.get_mut(id) {
                router.lib_mut().install(
                    entry.in_label,
                    entry.in_interface,
                    entry.ops.clone(),
                    entry.out_interface,
                    entry.fec,
                );
            }
        }
        Ok(())
    }

    /// Set the maximum number of events processed per operation (`None`
    /// disables the limit).
    pub fn set_msg_limit(&mut self, stop_after: Option<usize>) {
        self.stop_after = stop_after;
    }

    /// Signal the tunnel from `src` to `dest` and run the network until
    /// the signaling has converged.
    pub fn request_tunnel(&mut self, src: RouterAddr, dest: RouterAddr) -> Result<(), NetworkError> {
        let id = *self.addr_to_id.get(&src).ok_or(NetworkError::DeviceAddrNotFound(src))?;
        let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
        router.path_request(dest, &mut self.ted, &mut self.queue)?;
        self.do_queue()
    }

    /// Tear the tunnel from `src` to `dest` down.
    pub fn teardown_tunnel(&mut self, src: RouterAddr, dest: RouterAddr) -> Result<(), NetworkError> {
        let id = *self.addr_to_id.get(&src).ok_or(NetworkError::DeviceAddrNotFound(src))?;
        let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
        router.teardown_request(dest, &mut self.ted, &mut self.queue)?;
        self.do_queue()
    }

    /// Operator command: re-signal the tunnel from `src` to `dest` with a
    /// new bandwidth, using the doubled LSP id to mark the attempt as a
    /// reroute.
    pub fn new_bandwidth_request(
        &mut self,
        src: RouterAddr,
        dest: RouterAddr,
        bandwidth: Bandwidth,
    ) -> Result<(), NetworkError> {
        let id = *self.addr_to_id.get(&src).ok_or(NetworkError::DeviceAddrNotFound(src))?;
        let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
        router.new_bandwidth_request(dest, bandwidth, &mut self.ted, &mut self.queue)?;
        self.do_queue()
    }

    /// Operator command: let the head end `src` look for better routes for
    /// its recorded LSPs and re-signal where one exists.
    pub fn new_route_discover(&mut self, src: RouterAddr) -> Result<(), NetworkError> {
        let id = *self.addr_to_id.get(&src).ok_or(NetworkError::DeviceAddrNotFound(src))?;
        let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
        router.new_route_discover(&mut self.ted, &mut self.queue)?;
        self.do_queue()
    }

    /// Run one LDP discovery round on every router and drain the queue:
    /// peers discover each other, open exactly one session per pair, and
    /// become operational.
    pub fn start_ldp(&mut self) -> Result<(), NetworkError> {
        for router in self.routers.values_mut() {
            router.ldp_start_discovery(&self.ted, &mut self.queue);
        }
        self.do_queue()
    }

    /// Request a label binding for `fec` at the head end `src` over LDP.
    pub fn ldp_request_label(&mut self, src: RouterAddr, fec: RouterAddr) -> Result<(), NetworkError> {
        let id = *self.addr_to_id.get(&src).ok_or(NetworkError::DeviceAddrNotFound(src))?;
        let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
        router.ldp_request_label(fec, &self.ted, &mut self.queue);
        self.do_queue()
    }

    /// Deliver all enqueued events in FIFO order until the queue is empty.
    pub fn do_queue(&mut self) -> Result<(), NetworkError> {
        let mut remaining = self.stop_after;
        while let Some(event) = self.queue.pop_front() {
            if let Some(rem) = remaining.as_mut() {
                if *rem == 0 {
                    return Err(NetworkError::NoConvergence);
                }
                *rem -= 1;
            }
            let target = event.target();
            let id = *self
                .addr_to_id
                .get(&target)
                .ok_or(NetworkError::DeviceAddrNotFound(target))?;
            let router = self.routers.get_mut(&id).ok_or(NetworkError::DeviceNotFound(id))?;
            router.handle_event(event, &mut self.ted, &mut self.queue)?;
        }
        Ok(())
    }

    /// The current traffic engineering database.
    pub fn ted(&self) -> &Ted {
        self.ted.current()
    }

    /// Mutable access to the TED service (re-provisioning).
    pub fn ted_service_mut(&mut self) -> &mut TedService {
        &mut self.ted
    }

    /// Ids of all routers in the network, in no particular order.
    pub fn get_routers(&self) -> Vec<RouterId> {
        self.routers.keys().copied().collect()
    }

    /// Get a router by its graph id.
    pub fn get_router(&self, id: RouterId) -> Result<&Router, NetworkError> {
        self.routers.get(&id).ok_or(NetworkError::DeviceNotFound(id))
    }

    /// Get a router by its address.
    pub fn get_router_by_addr(&self, addr: RouterAddr) -> Result<&Router, NetworkError> {
        let id = self.addr_to_id.get(&addr).ok_or(NetworkError::DeviceAddrNotFound(addr))?;
        self.get_router(*id)
    }

    /// Get a router by its name.
    pub fn get_router_by_name(&self, name: &str) -> Result<&Router, NetworkError> {
        self.routers
            .values()
            .find(|r| r.name() == name)
            .ok_or_else(|| NetworkError::DeviceNameNotFound(name.to_string()))
    }

    /// The address of the router with the given graph id.
    pub fn addr_of(&self, id: RouterId) -> Result<RouterAddr, NetworkError> {
        self.id_to_addr.get(&id).copied().ok_or(NetworkError::DeviceNotFound(id))
    }

    /// Number of events still enqueued (zero after a drained operation).
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
