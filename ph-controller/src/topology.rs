/*
Copyright (c) 2022 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Builder for the fixed six-device topology of the path-protection test
//! network.
//!
//! The graph has one ingress (`s1`), one egress (`s4`), and two disjoint
//! transit legs between them: the bottom pair `s6` -> `s5` carries the
//! primary path, the top pair `s2` -> `s3` the pre-provisioned backup.
//! Addresses, device ids and link MACs are compiled-in constants matching
//! the mininet deployment; the builder is expected to run exactly once per
//! process.

use crate::switch::{
    ArrivalPort, EgressPorts, HostRoute, IngressPorts, LinkRewrite, PortMap, ProtectedFlow,
    Switch, TransitPorts,
};

use itertools::Itertools;

use std::net::Ipv4Addr;

/// The six devices of the test network, keyed by logical position.
#[derive(Clone, Debug)]
pub struct Topology {
    pub ingress: Switch,
    pub transit_top_left: Switch,
    pub transit_top_right: Switch,
    pub transit_bottom_left: Switch,
    pub transit_bottom_right: Switch,
    pub egress: Switch,
}

impl Topology {
    /// Switches in position order: ingress, primary leg, backup leg, egress.
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.positions().map(|(_, sw)| sw)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&'static str, &Switch)> {
        [
            ("ingress", &self.ingress),
            ("transit_bottom_left", &self.transit_bottom_left),
            ("transit_bottom_right", &self.transit_bottom_right),
            ("transit_top_left", &self.transit_top_left),
            ("transit_top_right", &self.transit_top_right),
            ("egress", &self.egress),
        ]
        .into_iter()
    }
}

fn transit(
    device_id: u64,
    name: &str,
    address: &str,
    upstream_mac: &str,
    upstream_port: u32,
    downstream: LinkRewrite,
) -> Switch {
    Switch {
        device_id,
        name: name.to_string(),
        address: address.to_string(),
        ports: PortMap::Transit(TransitPorts {
            upstream: ArrivalPort {
                mac: upstream_mac.to_string(),
                port: upstream_port,
            },
            downstream,
        }),
    }
}

fn link(egress_port: u32, source_mac: &str, next_hop_mac: &str) -> LinkRewrite {
    LinkRewrite {
        egress_port,
        source_mac: source_mac.to_string(),
        next_hop_mac: next_hop_mac.to_string(),
    }
}

/// Creates the switch set matching the mininet topology.
///
/// Panics on duplicate device ids or names; the constants are wrong in that
/// case and no partial topology must escape.
pub fn build_topology() -> Topology {
    let ingress = Switch {
        device_id: 0,
        name: "s1".to_string(),
        address: "localhost:50051".to_string(),
        ports: PortMap::Ingress(IngressPorts {
            host: ArrivalPort {
                mac: "08:00:00:00:01:00".to_string(),
                port: 1,
            },
            clone_port: 2,
            primary: link(3, "00:00:00:00:01:03", "00:00:00:00:06:03"),
            backup: link(2, "00:00:00:00:01:02", "00:00:00:00:02:02"),
        }),
    };

    // Primary leg, in path order.
    let transit_bottom_left = transit(
        5,
        "s6",
        "localhost:50056",
        "00:00:00:00:06:03",
        3,
        link(2, "00:00:00:00:06:02", "00:00:00:00:05:02"),
    );
    let transit_bottom_right = transit(
        4,
        "s5",
        "localhost:50055",
        "00:00:00:00:05:02",
        2,
        link(3, "00:00:00:00:05:03", "00:00:00:00:04:03"),
    );

    // Backup leg, in path order.
    let transit_top_left = transit(
        1,
        "s2",
        "localhost:50052",
        "00:00:00:00:02:02",
        2,
        link(3, "00:00:00:00:02:03", "00:00:00:00:03:03"),
    );
    let transit_top_right = transit(
        2,
        "s3",
        "localhost:50053",
        "00:00:00:00:03:03",
        3,
        link(2, "00:00:00:00:03:02", "00:00:00:00:04:02"),
    );

    let egress = Switch {
        device_id: 3,
        name: "s4".to_string(),
        address: "localhost:50054".to_string(),
        ports: PortMap::Egress(EgressPorts {
            primary_arrival: ArrivalPort {
                mac: "00:00:00:00:04:02".to_string(),
                port: 2,
            },
            backup_arrival: ArrivalPort {
                mac: "00:00:00:00:04:03".to_string(),
                port: 3,
            },
            host_port: 1,
            clone_port: 1,
            hosts: vec![
                HostRoute {
                    host: Ipv4Addr::new(10, 0, 2, 100),
                    source_mac: "08:00:00:00:02:00".to_string(),
                    next_hop_mac: "08:00:00:00:02:22".to_string(),
                },
                HostRoute {
                    host: Ipv4Addr::new(10, 0, 2, 101),
                    source_mac: "08:00:00:00:02:00".to_string(),
                    next_hop_mac: "08:00:00:00:02:23".to_string(),
                },
            ],
        }),
    };

    let topology = Topology {
        ingress,
        transit_top_left,
        transit_top_right,
        transit_bottom_left,
        transit_bottom_right,
        egress,
    };

    assert!(
        topology.switches().map(|sw| sw.device_id).all_unique(),
        "duplicate device id in topology constants"
    );
    assert!(
        topology.switches().map(|sw| sw.name.as_str()).all_unique(),
        "duplicate switch name in topology constants"
    );

    topology
}

/// The one protected connection provisioned across the topology.
pub fn protected_flow() -> ProtectedFlow {
    ProtectedFlow {
        source_ip: Ipv4Addr::new(10, 0, 1, 100),
        destination_ip: Ipv4Addr::new(10, 0, 2, 100),
        destination_network: Ipv4Addr::new(10, 0, 2, 0),
        prefix_len: 24,
        connection_id: 1,
        clone_session_id: 500,
    }
}
