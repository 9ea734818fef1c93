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

//! Control plane for a path-protected dataplane: derives and installs the
//! forwarding state that provisions a primary and a backup path between an
//! ingress and an egress device, with clone sessions feeding the
//! protection-header logic at both ends.
//!
//! The transport is consumed through the [`p4entry::SwitchClient`]
//! capability; an embedding binary supplies the concrete gRPC client, the
//! pipeline artifact paths, and a shutdown signal.

pub mod roles;
pub mod session;
pub mod switch;
pub mod tables;
pub mod topology;

use crate::roles::ConfigWrite;
use crate::session::DeviceError;
use crate::switch::{ProtectedFlow, Switch};
use crate::topology::Topology;

use futures::future::join_all;

use p4entry::{ForwardingPipeline, SwitchClient};

use std::sync::Arc;

use tokio::sync::watch;

use tracing::{event, Level};

/// Outcome of one device's configuration sequence.
#[derive(Debug)]
pub struct DeviceReport {
    pub device: String,
    pub result: Result<usize, DeviceError>,
}

impl DeviceReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// True when every device in the topology was configured completely; the
/// embedding binary maps this onto its exit status.
pub fn all_succeeded(reports: &[DeviceReport]) -> bool {
    reports.iter().all(DeviceReport::succeeded)
}

/// Orchestrates configuration of a whole topology over one transport.
pub struct Controller<C: SwitchClient> {
    client: Arc<C>,
    pipeline: Arc<ForwardingPipeline>,
}

impl<C> Controller<C>
where
    C: SwitchClient + 'static,
{
    pub fn new(client: C, pipeline: ForwardingPipeline) -> Self {
        Controller {
            client: Arc::new(client),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Configures every device in the topology concurrently, one task per
    /// device.  Devices share no state, so inter-device order is free;
    /// each device's own write sequence is applied strictly in order.
    ///
    /// Reports come back in topology position order, one per device,
    /// regardless of individual failures.
    pub async fn configure(
        &self,
        topology: &Topology,
        flow: &ProtectedFlow,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<DeviceReport> {
        let tasks = topology.positions().map(|(position, sw)| {
            let writes = roles::plan_writes(sw, flow);
            event!(
                Level::INFO,
                "{}: planned {} writes for {} position",
                sw.name,
                writes.len(),
                position
            );
            self.configure_one(sw.clone(), writes, shutdown.clone())
        });

        let handles: Vec<_> = tasks
            .map(|task| tokio::spawn(task))
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            // Configuration tasks do not panic; a join error would mean the
            // runtime tore them down underneath us.
            let report = joined.expect("device configuration task failed to join");
            match &report.result {
                Ok(applied) => {
                    event!(Level::INFO, "{}: configured ({} writes)", report.device, applied)
                }
                Err(e) => event!(Level::ERROR, "{}: configuration failed ({})", report.device, e),
            }
            reports.push(report);
        }
        reports
    }

    fn configure_one(
        &self,
        switch: Switch,
        writes: Vec<ConfigWrite>,
        shutdown: watch::Receiver<bool>,
    ) -> impl std::future::Future<Output = DeviceReport> + Send + 'static {
        let client = Arc::clone(&self.client);
        let pipeline = Arc::clone(&self.pipeline);
        async move {
            let result =
                session::configure_device(&*client, &switch, &pipeline, &writes, shutdown).await;
            DeviceReport {
                device: switch.name,
                result,
            }
        }
    }
}
