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

use mplsim::config::{Config, TrafficRequest};
use mplsim::network::Network;
use mplsim::types::{Bandwidth, NetworkError, RouterAddr};

use clap::{Parser, Subcommand};
use log::*;
use std::error::Error;

#[derive(Parser)]
#[clap(author, version, about = "MPLS traffic-engineering signaling simulator")]
struct CommandLineArguments {
    #[clap(subcommand)]
    cmd: MainCommand,
}

#[derive(Subcommand)]
enum MainCommand {
    /// Signal one tunnel over a linear topology and show the resulting
    /// label and bandwidth state.
    Linear {
        /// Number of routers on the line
        #[clap(short, long, default_value = "4")]
        routers: usize,
        /// Requested bandwidth
        #[clap(short, long, default_value = "100.0")]
        bandwidth: Bandwidth,
    },
    /// Let a strong tunnel preempt a weak one on a shared link.
    Preempt,
    /// Establish a tunnel, make a cheaper path available, and re-route
    /// with make-before-break.
    Reroute,
    /// Run LDP discovery on a linear topology and distribute labels for
    /// the last router hop by hop.
    Ldp {
        /// Number of routers on the line
        #[clap(short, long, default_value = "3")]
        routers: usize,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let args = CommandLineArguments::parse();
    match args.cmd {
        MainCommand::Linear { routers, bandwidth } => linear(routers, bandwidth)?,
        MainCommand::Preempt => preempt()?,
        MainCommand::Reroute => reroute()?,
        MainCommand::Ldp { routers } => ldp(routers)?,
    }
    Ok(())
}

/// Build a linear network `R1 -- R2 -- ... -- Rn` with uniform capacity
/// 1000 and metric 1.
fn linear_net(routers: usize) -> Result<Network, NetworkError> {
    let mut net = Network::new();
    let ids: Vec<_> = (1..=routers).map(|i| net.add_router(format!("R{}", i))).collect();
    for pair in ids.windows(2) {
        net.add_link(pair[0], pair[1], 1000.0, 1.0);
    }
    net.build_topology()?;
    Ok(net)
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

fn linear(routers: usize, bandwidth: Bandwidth) -> Result<(), Box<dyn Error>> {
    let mut net = linear_net(routers)?;
    let src = RouterAddr::nth(0);
    let dest = RouterAddr::nth(routers - 1);
    let mut c = Config::new();
    c.add_request(request(src, dest, bandwidth, 7, 7))?;
    net.set_config(&c)?;

    info!("signaling a tunnel from {} to {}", src, dest);
    net.request_tunnel(src, dest)?;
    print_state(&net)?;
    Ok(())
}

fn preempt() -> Result<(), Box<dyn Error>> {
    let mut net = linear_net(4)?;
    let a1 = RouterAddr::nth(0);
    let a3 = RouterAddr::nth(2);
    let a4 = RouterAddr::nth(3);
    let mut c = Config::new();
    c.add_request(request(a1, a3, 600.0, 7, 7))?;
    c.add_request(request(a1, a4, 600.0, 0, 0))?;
    net.set_config(&c)?;

    info!("signaling the weak tunnel from {} to {}", a1, a3);
    net.request_tunnel(a1, a3)?;
    info!("signaling the strong tunnel from {} to {}", a1, a4);
    net.request_tunnel(a1, a4)?;
    print_state(&net)?;
    Ok(())
}

fn reroute() -> Result<(), Box<dyn Error>> {
    let mut net = Network::new();
    let r1 = net.add_router("R1");
    let r2 = net.add_router("R2");
    let r3 = net.add_router("R3");
    let r4 = net.add_router("R4");
    net.add_link(r1, r2, 1000.0, 1.0);
    net.add_link(r2, r4, 1000.0, 1.0);
    net.add_link(r1, r3, 1000.0, 5.0);
    net.add_link(r3, r4, 1000.0, 5.0);
    net.build_topology()?;
    let a1 = net.addr_of(r1)?;
    let a3 = net.addr_of(r3)?;
    let a4 = net.addr_of(r4)?;
    let mut c = Config::new();
    c.add_request(request(a1, a4, 100.0, 7, 7))?;
    net.set_config(&c)?;

    info!("signaling a tunnel from {} to {}", a1, a4);
    net.request_tunnel(a1, a4)?;

    info!("making the southern path cheaper and re-discovering routes");
    for (a, b) in [(a1, a3), (a3, a1), (a3, a4), (a4, a3)].iter() {
        net.ted_service_mut().update_link(*a, *b, 0.5, 1000.0);
    }
    net.new_route_discover(a1)?;
    print_state(&net)?;
    Ok(())
}

fn ldp(routers: usize) -> Result<(), Box<dyn Error>> {
    let mut net = linear_net(routers)?;
    let src = RouterAddr::nth(0);
    let fec = RouterAddr::nth(routers - 1);

    info!("running LDP discovery");
    net.start_ldp()?;
    info!("requesting a label binding for {}", fec);
    net.ldp_request_label(src, fec)?;
    print_state(&net)?;
    Ok(())
}

/// Print the label table of every router and the bandwidth state of every
/// link.
fn print_state(net: &Network) -> Result<(), NetworkError> {
    let mut ids = net.get_routers();
    ids.sort();
    println!("Label Information Bases:");
    for id in ids {
        let router = net.get_router(id)?;
        println!("  {} ({})", router.name(), router.addr());
        for entry in router.lib().entries() {
            println!(
                "    in: {:>9} @ {:<12} ops: {:<12} out: {:<12} fec: {}",
                entry.in_label,
                entry
                    .in_interface
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "local".to_string()),
                format!("{:?}", entry.ops),
                entry
                    .out_interface
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "deliver".to_string()),
                entry.fec,
            );
        }
    }
    println!("Traffic Engineering Database:");
    for link in &net.ted().links {
        println!(
            "  {} -> {}: metric {}, capacity {}, unreserved[0] {}, unreserved[7] {}",
            link.advrouter,
            link.linkid,
            link.metric,
            link.max_bandwidth,
            link.unreserved[0],
            link.unreserved[7],
        );
    }
    Ok(())
}
