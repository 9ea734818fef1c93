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

//! Entry factory for the protection-header dataplane program.
//!
//! Each function is a pure mapping from semantic parameters to a
//! [`TableEntry`] carrying the program's schema identifiers verbatim.  No
//! function performs I/O, so every derived entry can be checked without a
//! live device.

use p4entry::{MatchValue, TableEntry, Value};

use std::net::Ipv4Addr;

/// Accepts frames addressed to one of this device's interface MACs on the
/// given ingress port.  The action is a no-op; the match itself is the
/// learning decision.
pub fn mac_learning_entry(mac: &str, ingress_port: u32) -> TableEntry {
    TableEntry {
        table_name: "MyIngress.interface_mac_address".to_string(),
        match_fields: vec![
            ("hdr.ethernet.dstAddr".to_string(), MatchValue::exact(mac)),
            (
                "standard_metadata.ingress_port".to_string(),
                MatchValue::exact(ingress_port),
            ),
        ],
        action_name: "MyIngress.no_action".to_string(),
        action_params: vec![],
    }
}

/// Routes traffic for `dst_network/prefix_len` out of `egress_port` on the
/// working path.
///
/// `prefix_len` beyond 32 is a caller contract violation and fails fast.
pub fn routing_entry(dst_network: Ipv4Addr, prefix_len: u8, egress_port: u32) -> TableEntry {
    assert!(prefix_len <= 32, "IPv4 prefix length {} out of range", prefix_len);
    TableEntry {
        table_name: "MyIngress.working_routing_path_table".to_string(),
        match_fields: vec![(
            "hdr.ipv4.dstAddr".to_string(),
            MatchValue::lpm(dst_network, prefix_len),
        )],
        action_name: "MyIngress.forward".to_string(),
        action_params: vec![("port".to_string(), Value::from(egress_port))],
    }
}

/// Rewrites the Ethernet source and destination for traffic leaving
/// `egress_port` toward `dst_network/prefix_len`, delivering it to the
/// next hop on that link.
pub fn egress_rewrite_entry(
    dst_network: Ipv4Addr,
    prefix_len: u8,
    egress_port: u32,
    source_mac: &str,
    next_hop_mac: &str,
) -> TableEntry {
    assert!(prefix_len <= 32, "IPv4 prefix length {} out of range", prefix_len);
    TableEntry {
        table_name: "MyEgress.next_hop_table".to_string(),
        match_fields: vec![
            (
                "standard_metadata.egress_port".to_string(),
                MatchValue::exact(egress_port),
            ),
            (
                "hdr.ipv4.dstAddr".to_string(),
                MatchValue::lpm(dst_network, prefix_len),
            ),
        ],
        action_name: "MyEgress.set_mac".to_string(),
        action_params: vec![
            ("srcAddr".to_string(), Value::from(source_mac)),
            ("dstAddr".to_string(), Value::from(next_hop_mac)),
        ],
    }
}

/// Marks the (source, destination) pair as a protected connection and
/// attaches its metadata: connection id, the protection-ingress/egress
/// flags lowered to 0/1, and the clone session to feed (0 when this device
/// originates no clone).
pub fn protection_entry(
    source_ip: Ipv4Addr,
    destination_ip: Ipv4Addr,
    connection_id: u32,
    is_ph_ingress: bool,
    is_ph_egress: bool,
    clone_session_id: u32,
) -> TableEntry {
    TableEntry {
        table_name: "MyIngress.protected_connections".to_string(),
        match_fields: vec![
            ("hdr.ipv4.srcAddr".to_string(), MatchValue::exact(source_ip)),
            (
                "hdr.ipv4.dstAddr".to_string(),
                MatchValue::exact(destination_ip),
            ),
        ],
        action_name: "MyIngress.associate_protected_details".to_string(),
        action_params: vec![
            ("connection".to_string(), Value::from(connection_id)),
            ("isPHIngressFlag".to_string(), Value::from(is_ph_ingress)),
            ("isPHEgressFlag".to_string(), Value::from(is_ph_egress)),
            ("sessionID".to_string(), Value::from(clone_session_id)),
        ],
    }
}
