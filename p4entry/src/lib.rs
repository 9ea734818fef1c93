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

//! Wire-agnostic P4Runtime-style entities and the switch-client capability.
//!
//! This crate defines the value types a control plane derives (table entries
//! and clone sessions), the forwarding-pipeline artifact pair that must be
//! pushed to a device before any entry write, and the [`SwitchClient`] /
//! [`SwitchSession`] traits behind which the actual P4Runtime/gRPC transport
//! lives.  Nothing here performs network I/O; table, action and field
//! identifiers are opaque schema strings that the transport validates.

use async_trait::async_trait;

use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// An exact scalar carried in a match field or an action parameter.
///
/// String values keep the external encoding byte-for-byte: MAC addresses as
/// colon-separated hex, IPv4 addresses in dotted form.  Booleans are lowered
/// to the integers 0 and 1 at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(u64),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(if v { 1 } else { 0 })
    }
}

impl From<Ipv4Addr> for Value {
    fn from(addr: Ipv4Addr) -> Self {
        Value::Str(addr.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

/// The value side of one match field: either an exact value or a
/// longest-prefix-match (network, prefix-length) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchValue {
    Exact(Value),
    Lpm { network: String, prefix_len: u8 },
}

impl MatchValue {
    pub fn exact<V: Into<Value>>(v: V) -> Self {
        MatchValue::Exact(v.into())
    }

    pub fn lpm(network: Ipv4Addr, prefix_len: u8) -> Self {
        MatchValue::Lpm {
            network: network.to_string(),
            prefix_len,
        }
    }
}

impl Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchValue::Exact(v) => write!(f, "{}", v),
            MatchValue::Lpm {
                network,
                prefix_len,
            } => write!(f, "{}/{}", network, prefix_len),
        }
    }
}

/// One rule to be installed into a device's forwarding pipeline: match-field
/// values plus an action with parameters.
///
/// Match fields and parameters are ordered sequences rather than maps so that
/// a derived entry list renders and compares identically from run to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableEntry {
    pub table_name: String,
    pub match_fields: Vec<(String, MatchValue)>,
    pub action_name: String,
    pub action_params: Vec<(String, Value)>,
}

impl Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {} {{", self.table_name)?;
        for (i, (name, value)) in self.match_fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}={}", name, value)?;
        }
        write!(f, " }} -> {}(", self.action_name)?;
        for (i, (name, value)) in self.action_params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

/// A packet-replication-engine clone session: duplicates a matched packet to
/// `egress_port` as replica `instance_id`.
///
/// `session_id` must be unique per device.  A `max_packet_length` of zero
/// means the clone is never truncated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloneSession {
    pub session_id: u32,
    pub instance_id: u32,
    pub egress_port: u32,
    pub max_packet_length: u32,
}

impl CloneSession {
    pub fn new(session_id: u32, instance_id: u32, egress_port: u32) -> Self {
        CloneSession {
            session_id,
            instance_id,
            egress_port,
            max_packet_length: 0,
        }
    }
}

impl Display for CloneSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clone session {} -> port {} (instance {})",
            self.session_id, self.egress_port, self.instance_id
        )
    }
}

/// The compiled pipeline artifacts pushed to every device before entry
/// writes: the P4Info schema and the opaque target binary (BMv2 JSON).
#[derive(Clone, Debug)]
pub struct ForwardingPipeline {
    pub p4info_path: PathBuf,
    pub device_config_path: PathBuf,
    pub p4info: Vec<u8>,
    pub device_config: Vec<u8>,
}

impl ForwardingPipeline {
    /// Loads both artifacts, checking for existence first.  A missing file
    /// is a startup-fatal precondition; no device may be contacted without
    /// a loadable pipeline.
    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        p4info_path: P,
        device_config_path: Q,
    ) -> Result<Self, ArtifactError> {
        let p4info_path = p4info_path.as_ref().to_path_buf();
        let device_config_path = device_config_path.as_ref().to_path_buf();

        for path in [&p4info_path, &device_config_path] {
            if !path.exists() {
                return Err(ArtifactError::Missing(path.clone()));
            }
        }

        let read = |path: &PathBuf| {
            fs::read(path).map_err(|source| ArtifactError::Unreadable {
                path: path.clone(),
                source,
            })
        };
        let p4info = read(&p4info_path)?;
        let device_config = read(&device_config_path)?;

        Ok(ForwardingPipeline {
            p4info_path,
            device_config_path,
            p4info,
            device_config,
        })
    }
}

/// Failure to load a pipeline artifact at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{0}: pipeline artifact not found; have you compiled the dataplane?")]
    Missing(PathBuf),
    #[error("{path}: could not read pipeline artifact ({source})")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors reported by the transport while talking to one device.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("could not connect to device {device_id} at {address} ({reason})")]
    Connection {
        device_id: u64,
        address: String,
        reason: String,
    },
    #[error("device {device_id} refused primary-controller arbitration ({reason})")]
    Arbitration { device_id: u64, reason: String },
    #[error("device {device_id} rejected the pipeline config ({reason})")]
    ConfigPush { device_id: u64, reason: String },
    #[error("entry rejected by table {table} ({reason})")]
    RejectedEntry { table: String, reason: String },
}

/// Factory for per-device control sessions.  Implemented by the external
/// P4Runtime/gRPC transport; the control plane only consumes it.
#[async_trait]
pub trait SwitchClient: Send + Sync {
    type Session: SwitchSession + Send;

    /// Opens a control connection to the device at `address`.
    async fn open(&self, device_id: u64, address: &str) -> Result<Self::Session, ClientError>;
}

/// One open control session to one device.
///
/// [`claim_primary`](Self::claim_primary) and
/// [`set_pipeline`](Self::set_pipeline) must both succeed, in that order,
/// before any write is attempted.  Writes return only once the device has
/// acknowledged or rejected them.  [`close`](Self::close) is best-effort and
/// never fails observably; callers invoke it exactly once on every exit path.
#[async_trait]
pub trait SwitchSession {
    async fn claim_primary(&mut self) -> Result<(), ClientError>;

    async fn set_pipeline(&mut self, pipeline: &ForwardingPipeline) -> Result<(), ClientError>;

    async fn write_entry(&mut self, entry: &TableEntry) -> Result<(), ClientError>;

    async fn write_clone_session(&mut self, session: &CloneSession) -> Result<(), ClientError>;

    async fn close(&mut self);
}
