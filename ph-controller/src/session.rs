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

//! Scoped configuration of a single device.
//!
//! A session lives exactly as long as the configuration step: open, claim
//! the primary-controller role, push the pipeline, apply the write sequence
//! in order, close.  Close runs on every exit path once a session was
//! opened -- success, rejected write, or operator interruption.  There is no
//! rollback: entries already acknowledged stay installed, and re-running
//! with identical parameters is idempotent at the transport.

use crate::roles::ConfigWrite;
use crate::switch::Switch;

use p4entry::{ClientError, ForwardingPipeline, SwitchClient, SwitchSession};

use thiserror::Error;

use tokio::sync::watch;

use tracing::{event, Level};

/// Failure of one device's configuration sequence.  Other devices'
/// sequences are unaffected.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{device}: session setup failed ({source})")]
    Session {
        device: String,
        #[source]
        source: ClientError,
    },
    #[error("{device}: write rejected for [{write}] ({source})")]
    Write {
        device: String,
        write: String,
        #[source]
        source: ClientError,
    },
    #[error("{device}: configuration interrupted by operator")]
    Interrupted { device: String },
}

/// Resolves once shutdown is requested; pends forever if the shutdown
/// sender disappears without requesting one.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Applies `writes` to one device inside a session bounded to this call.
///
/// Returns the number of writes acknowledged by the device.  On failure the
/// remaining writes are abandoned, the error is surfaced with the device
/// name and the offending write, and the session is still closed.
pub async fn configure_device<C: SwitchClient>(
    client: &C,
    switch: &Switch,
    pipeline: &ForwardingPipeline,
    writes: &[ConfigWrite],
    mut shutdown: watch::Receiver<bool>,
) -> Result<usize, DeviceError> {
    let interrupted = || DeviceError::Interrupted {
        device: switch.name.clone(),
    };
    let setup_err = |source| DeviceError::Session {
        device: switch.name.clone(),
        source,
    };

    event!(Level::INFO, "{}: opening control session", switch);
    let mut session = tokio::select! {
        biased;
        _ = shutdown_requested(&mut shutdown) => return Err(interrupted()),
        opened = client.open(switch.device_id, &switch.address) => opened.map_err(setup_err)?,
    };

    let result = drive_session(&mut session, switch, pipeline, writes, &mut shutdown).await;
    session.close().await;
    event!(Level::INFO, "{}: control session closed", switch.name);

    result
}

async fn drive_session<S: SwitchSession>(
    session: &mut S,
    switch: &Switch,
    pipeline: &ForwardingPipeline,
    writes: &[ConfigWrite],
    shutdown: &mut watch::Receiver<bool>,
) -> Result<usize, DeviceError> {
    let setup_err = |source| DeviceError::Session {
        device: switch.name.clone(),
        source,
    };

    session.claim_primary().await.map_err(setup_err)?;
    session.set_pipeline(pipeline).await.map_err(setup_err)?;
    event!(
        Level::INFO,
        "{}: pipeline installed, applying {} writes",
        switch.name,
        writes.len()
    );

    let mut applied = 0;
    for write in writes {
        let outcome = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => {
                event!(
                    Level::WARN,
                    "{}: interrupted after {} of {} writes",
                    switch.name,
                    applied,
                    writes.len()
                );
                return Err(DeviceError::Interrupted { device: switch.name.clone() });
            }
            res = apply_write(session, write) => res,
        };

        if let Err(source) = outcome {
            event!(Level::ERROR, "{}: device rejected [{}] ({})", switch.name, write, source);
            return Err(DeviceError::Write {
                device: switch.name.clone(),
                write: write.to_string(),
                source,
            });
        }
        event!(Level::DEBUG, "{}: installed {}", switch.name, write);
        applied += 1;
    }

    Ok(applied)
}

async fn apply_write<S: SwitchSession>(
    session: &mut S,
    write: &ConfigWrite,
) -> Result<(), ClientError> {
    match write {
        ConfigWrite::Entry(entry) => session.write_entry(entry).await,
        ConfigWrite::CloneSession(clone) => session.write_clone_session(clone).await,
    }
}
