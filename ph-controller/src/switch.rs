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

//! The switch model: device identity plus its role-specific position in the
//! primary/backup path graph.  A [`Switch`] is constructed once by the
//! topology builder and immutable thereafter; it never owns a live
//! connection.

use std::fmt::{self, Display};
use std::net::Ipv4Addr;

/// Role of a device in the protected path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchRole {
    Ingress,
    Transit,
    Egress,
}

impl Display for SwitchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchRole::Ingress => "ingress",
            SwitchRole::Transit => "transit",
            SwitchRole::Egress => "egress",
        };
        write!(f, "{}", s)
    }
}

/// One outgoing link: the local egress port plus the MAC pair to stamp on
/// frames leaving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRewrite {
    pub egress_port: u32,
    pub source_mac: String,
    pub next_hop_mac: String,
}

/// One incoming link: the interface MAC the upstream device addresses and
/// the local port it arrives on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrivalPort {
    pub mac: String,
    pub port: u32,
}

/// A directly attached host served by the egress device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostRoute {
    pub host: Ipv4Addr,
    pub source_mac: String,
    pub next_hop_mac: String,
}

/// Port assignment of the ingress device: the host-facing side, the local
/// port fed by the protection clone, and the two legs toward the egress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressPorts {
    pub host: ArrivalPort,
    pub clone_port: u32,
    pub primary: LinkRewrite,
    pub backup: LinkRewrite,
}

/// Port assignment of a transit device: where the upstream neighbor arrives
/// and which link carries traffic onward.  Transit devices only forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitPorts {
    pub upstream: ArrivalPort,
    pub downstream: LinkRewrite,
}

/// Port assignment of the egress device.  Traffic must be accepted from
/// both legs regardless of which one delivered it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EgressPorts {
    pub primary_arrival: ArrivalPort,
    pub backup_arrival: ArrivalPort,
    pub host_port: u32,
    pub clone_port: u32,
    pub hosts: Vec<HostRoute>,
}

/// Role-specific topology position of one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortMap {
    Ingress(IngressPorts),
    Transit(TransitPorts),
    Egress(EgressPorts),
}

/// One programmable device in the test network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Switch {
    pub device_id: u64,
    pub name: String,
    pub address: String,
    pub ports: PortMap,
}

impl Switch {
    pub fn role(&self) -> SwitchRole {
        match self.ports {
            PortMap::Ingress(_) => SwitchRole::Ingress,
            PortMap::Transit(_) => SwitchRole::Transit,
            PortMap::Egress(_) => SwitchRole::Egress,
        }
    }
}

impl Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "switch {} (device {}, {} role) at {}",
            self.name,
            self.device_id,
            self.role(),
            self.address
        )
    }
}

/// The single protected flow this control plane provisions end to end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedFlow {
    pub source_ip: Ipv4Addr,
    pub destination_ip: Ipv4Addr,
    pub destination_network: Ipv4Addr,
    pub prefix_len: u8,
    pub connection_id: u32,
    pub clone_session_id: u32,
}

/// Per-device protection metadata for one flow.
///
/// Exactly one device in the path marks protection ingress and exactly one
/// marks protection egress; the constructors keep the two flags mutually
/// exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedConnection {
    pub source_ip: Ipv4Addr,
    pub destination_ip: Ipv4Addr,
    pub connection_id: u32,
    pub is_ph_ingress: bool,
    pub is_ph_egress: bool,
    pub clone_session_id: u32,
}

impl ProtectedConnection {
    /// Metadata for the device where protection processing begins.  The
    /// clone session referenced here duplicates traffic for the protection
    /// header.
    pub fn ingress(flow: &ProtectedFlow) -> Self {
        ProtectedConnection {
            source_ip: flow.source_ip,
            destination_ip: flow.destination_ip,
            connection_id: flow.connection_id,
            is_ph_ingress: true,
            is_ph_egress: false,
            clone_session_id: flow.clone_session_id,
        }
    }

    /// Metadata for the device where protection terminates.  No clone
    /// session id is attached; this device extracts the header rather than
    /// originating a clone.
    pub fn egress(flow: &ProtectedFlow) -> Self {
        ProtectedConnection {
            source_ip: flow.source_ip,
            destination_ip: flow.destination_ip,
            connection_id: flow.connection_id,
            is_ph_ingress: false,
            is_ph_egress: true,
            clone_session_id: 0,
        }
    }
}
