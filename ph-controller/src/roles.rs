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

//! Per-role configurators: derive the complete, order-significant write
//! sequence that realizes path protection on one device.
//!
//! The planners are pure; identical inputs yield identical sequences.  Intra-
//! device order matters -- a clone session must exist before any entry
//! references its id, and MAC learning precedes routing so no packet is
//! black-holed mid-configuration.  There is no cross-device ordering.

use crate::switch::{
    EgressPorts, IngressPorts, PortMap, ProtectedConnection, ProtectedFlow, Switch, TransitPorts,
};
use crate::tables;

use p4entry::{CloneSession, TableEntry};

use std::fmt::{self, Display};

/// One element of a device's configuration sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigWrite {
    Entry(TableEntry),
    CloneSession(CloneSession),
}

impl Display for ConfigWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWrite::Entry(entry) => write!(f, "{}", entry),
            ConfigWrite::CloneSession(session) => write!(f, "{}", session),
        }
    }
}

fn protection_write(conn: &ProtectedConnection) -> ConfigWrite {
    ConfigWrite::Entry(tables::protection_entry(
        conn.source_ip,
        conn.destination_ip,
        conn.connection_id,
        conn.is_ph_ingress,
        conn.is_ph_egress,
        conn.clone_session_id,
    ))
}

/// Writes for the ingress device.
///
/// The clone session is installed before the protection entry that
/// references its id; the transport rejects a dangling session reference.
pub fn ingress_writes(ports: &IngressPorts, flow: &ProtectedFlow) -> Vec<ConfigWrite> {
    let conn = ProtectedConnection::ingress(flow);
    vec![
        ConfigWrite::Entry(tables::mac_learning_entry(&ports.host.mac, ports.host.port)),
        ConfigWrite::CloneSession(CloneSession::new(
            flow.clone_session_id,
            flow.connection_id,
            ports.clone_port,
        )),
        protection_write(&conn),
        ConfigWrite::Entry(tables::routing_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.primary.egress_port,
        )),
        ConfigWrite::Entry(tables::egress_rewrite_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.primary.egress_port,
            &ports.primary.source_mac,
            &ports.primary.next_hop_mac,
        )),
        ConfigWrite::Entry(tables::egress_rewrite_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.backup.egress_port,
            &ports.backup.source_mac,
            &ports.backup.next_hop_mac,
        )),
    ]
}

/// Writes for a transit device on either leg: accept the upstream neighbor,
/// forward toward the destination network, rewrite MACs for the next hop.
pub fn transit_writes(ports: &TransitPorts, flow: &ProtectedFlow) -> Vec<ConfigWrite> {
    vec![
        ConfigWrite::Entry(tables::mac_learning_entry(
            &ports.upstream.mac,
            ports.upstream.port,
        )),
        ConfigWrite::Entry(tables::routing_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.downstream.egress_port,
        )),
        ConfigWrite::Entry(tables::egress_rewrite_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.downstream.egress_port,
            &ports.downstream.source_mac,
            &ports.downstream.next_hop_mac,
        )),
    ]
}

/// Writes for the egress device: accept arrivals from both legs, route to
/// the host network, rewrite per served host, then terminate protection.
pub fn egress_writes(ports: &EgressPorts, flow: &ProtectedFlow) -> Vec<ConfigWrite> {
    let conn = ProtectedConnection::egress(flow);
    let mut writes = vec![
        ConfigWrite::Entry(tables::mac_learning_entry(
            &ports.primary_arrival.mac,
            ports.primary_arrival.port,
        )),
        ConfigWrite::Entry(tables::mac_learning_entry(
            &ports.backup_arrival.mac,
            ports.backup_arrival.port,
        )),
        ConfigWrite::Entry(tables::routing_entry(
            flow.destination_network,
            flow.prefix_len,
            ports.host_port,
        )),
    ];
    for host in &ports.hosts {
        writes.push(ConfigWrite::Entry(tables::egress_rewrite_entry(
            host.host,
            32,
            ports.host_port,
            &host.source_mac,
            &host.next_hop_mac,
        )));
    }
    // Clone session for protection-header extraction; the terminating
    // protection entry carries no session id.
    writes.push(ConfigWrite::CloneSession(CloneSession::new(
        flow.clone_session_id,
        flow.connection_id,
        ports.clone_port,
    )));
    writes.push(protection_write(&conn));
    writes
}

/// Derives the full configuration sequence for one device according to its
/// role and topology position.
pub fn plan_writes(switch: &Switch, flow: &ProtectedFlow) -> Vec<ConfigWrite> {
    match &switch.ports {
        PortMap::Ingress(ports) => ingress_writes(ports, flow),
        PortMap::Transit(ports) => transit_writes(ports, flow),
        PortMap::Egress(ports) => egress_writes(ports, flow),
    }
}
