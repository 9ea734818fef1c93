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

use p4entry::{MatchValue, TableEntry, Value};

use ph_controller::roles::{plan_writes, ConfigWrite};
use ph_controller::switch::SwitchRole;
use ph_controller::topology::{build_topology, protected_flow};

fn entries(plan: &[ConfigWrite]) -> Vec<&TableEntry> {
    plan.iter()
        .filter_map(|w| match w {
            ConfigWrite::Entry(e) => Some(e),
            ConfigWrite::CloneSession(_) => None,
        })
        .collect()
}

fn entries_for<'a>(plan: &'a [ConfigWrite], table: &str) -> Vec<&'a TableEntry> {
    entries(plan)
        .into_iter()
        .filter(|e| e.table_name == table)
        .collect()
}

#[test]
fn topology_has_six_switches_with_one_ingress_and_one_egress() {
    let topology = build_topology();
    let switches: Vec<_> = topology.switches().collect();
    assert_eq!(switches.len(), 6);

    let mut names: Vec<_> = switches.iter().map(|sw| sw.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["s1", "s2", "s3", "s4", "s5", "s6"]);

    let count = |role| switches.iter().filter(|sw| sw.role() == role).count();
    assert_eq!(count(SwitchRole::Ingress), 1);
    assert_eq!(count(SwitchRole::Egress), 1);
    assert_eq!(count(SwitchRole::Transit), 4);
}

#[test]
fn planners_are_deterministic() {
    let topology = build_topology();
    let flow = protected_flow();
    for sw in topology.switches() {
        assert_eq!(plan_writes(sw, &flow), plan_writes(sw, &flow));
    }
}

#[test]
fn ingress_plan_provisions_host_clone_protection_and_both_legs() {
    let topology = build_topology();
    let flow = protected_flow();
    let plan = plan_writes(&topology.ingress, &flow);

    // Host-facing MAC learning.
    let mac_entries = entries_for(&plan, "MyIngress.interface_mac_address");
    assert_eq!(mac_entries.len(), 1);
    assert_eq!(
        mac_entries[0].match_fields[0].1,
        MatchValue::exact("08:00:00:00:01:00")
    );
    assert_eq!(mac_entries[0].match_fields[1].1, MatchValue::exact(1u32));

    // Clone session 500 with the instance mirroring the connection id.
    let sessions: Vec<_> = plan
        .iter()
        .filter_map(|w| match w {
            ConfigWrite::CloneSession(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, 500);
    assert_eq!(sessions[0].instance_id, 1);
    assert_eq!(sessions[0].egress_port, 2);

    // Protection entry marks this device as protection ingress only.
    let protection = entries_for(&plan, "MyIngress.protected_connections");
    assert_eq!(protection.len(), 1);
    let params = &protection[0].action_params;
    assert!(params.contains(&("isPHIngressFlag".to_string(), Value::Int(1))));
    assert!(params.contains(&("isPHEgressFlag".to_string(), Value::Int(0))));
    assert!(params.contains(&("sessionID".to_string(), Value::Int(500))));

    // Primary routing toward the destination network.
    let routes = entries_for(&plan, "MyIngress.working_routing_path_table");
    assert_eq!(routes.len(), 1);
    assert_eq!(
        routes[0].match_fields[0].1,
        MatchValue::Lpm {
            network: "10.0.2.0".to_string(),
            prefix_len: 24,
        }
    );

    // One rewrite per viable leg.
    assert_eq!(entries_for(&plan, "MyEgress.next_hop_table").len(), 2);
}

#[test]
fn ingress_clone_session_precedes_entries_referencing_it() {
    let topology = build_topology();
    let flow = protected_flow();
    let plan = plan_writes(&topology.ingress, &flow);

    let session_pos = plan
        .iter()
        .position(|w| matches!(w, ConfigWrite::CloneSession(s) if s.session_id == 500))
        .expect("ingress plan must contain the clone session");

    for (pos, write) in plan.iter().enumerate() {
        if let ConfigWrite::Entry(entry) = write {
            let references_session = entry
                .action_params
                .iter()
                .any(|(name, value)| name == "sessionID" && value == &Value::Int(500));
            if references_session {
                assert!(
                    session_pos < pos,
                    "clone session must be written before the entry referencing it"
                );
            }
        }
    }
}

#[test]
fn transit_plan_only_forwards() {
    let topology = build_topology();
    let flow = protected_flow();
    let plan = plan_writes(&topology.transit_bottom_left, &flow);

    assert_eq!(plan.len(), 3);
    assert!(plan
        .iter()
        .all(|w| matches!(w, ConfigWrite::Entry(_))));
    assert!(entries_for(&plan, "MyIngress.protected_connections").is_empty());

    // s6 accepts the ingress switch on port 3 and forwards out port 2.
    let macs = entries_for(&plan, "MyIngress.interface_mac_address");
    assert_eq!(macs[0].match_fields[0].1, MatchValue::exact("00:00:00:00:06:03"));
    let routes = entries_for(&plan, "MyIngress.working_routing_path_table");
    assert!(routes[0]
        .action_params
        .contains(&("port".to_string(), Value::Int(2))));
}

#[test]
fn each_transit_device_gets_its_own_link_parameters() {
    let topology = build_topology();
    let flow = protected_flow();

    let upstream_macs: Vec<String> = [
        &topology.transit_bottom_left,
        &topology.transit_bottom_right,
        &topology.transit_top_left,
        &topology.transit_top_right,
    ]
    .iter()
    .map(|sw| {
        let plan = plan_writes(sw, &flow);
        match &entries_for(&plan, "MyIngress.interface_mac_address")[0].match_fields[0].1 {
            MatchValue::Exact(Value::Str(mac)) => mac.clone(),
            other => panic!("unexpected match value {:?}", other),
        }
    })
    .collect();

    assert_eq!(
        upstream_macs,
        [
            "00:00:00:00:06:03",
            "00:00:00:00:05:02",
            "00:00:00:00:02:02",
            "00:00:00:00:03:03",
        ]
    );
}

#[test]
fn egress_plan_accepts_both_legs_and_terminates_protection() {
    let topology = build_topology();
    let flow = protected_flow();
    let plan = plan_writes(&topology.egress, &flow);

    // Arrival MAC entries for the primary and backup legs.
    let macs = entries_for(&plan, "MyIngress.interface_mac_address");
    assert_eq!(macs.len(), 2);
    assert_eq!(macs[0].match_fields[0].1, MatchValue::exact("00:00:00:00:04:02"));
    assert_eq!(macs[0].match_fields[1].1, MatchValue::exact(2u32));
    assert_eq!(macs[1].match_fields[0].1, MatchValue::exact("00:00:00:00:04:03"));
    assert_eq!(macs[1].match_fields[1].1, MatchValue::exact(3u32));

    // Host rewrite toward 10.0.2.100/32 out port 1 with the configured MACs.
    let rewrites = entries_for(&plan, "MyEgress.next_hop_table");
    assert_eq!(rewrites.len(), 2);
    assert_eq!(
        rewrites[0].match_fields,
        vec![
            (
                "standard_metadata.egress_port".to_string(),
                MatchValue::exact(1u32),
            ),
            (
                "hdr.ipv4.dstAddr".to_string(),
                MatchValue::Lpm {
                    network: "10.0.2.100".to_string(),
                    prefix_len: 32,
                },
            ),
        ]
    );
    assert_eq!(
        rewrites[0].action_params,
        vec![
            ("srcAddr".to_string(), Value::from("08:00:00:00:02:00")),
            ("dstAddr".to_string(), Value::from("08:00:00:00:02:22")),
        ]
    );

    // Protection terminates here: egress flag set, no originating session.
    let protection = entries_for(&plan, "MyIngress.protected_connections");
    assert_eq!(protection.len(), 1);
    let params = &protection[0].action_params;
    assert!(params.contains(&("isPHIngressFlag".to_string(), Value::Int(0))));
    assert!(params.contains(&("isPHEgressFlag".to_string(), Value::Int(1))));
    assert!(params.contains(&("sessionID".to_string(), Value::Int(0))));

    // The extraction clone session is still installed.
    assert!(plan
        .iter()
        .any(|w| matches!(w, ConfigWrite::CloneSession(s) if s.session_id == 500)));
}
