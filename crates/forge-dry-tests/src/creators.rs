// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Probe creators with scripted behaviour and call recording.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use forge_core::{ComponentKind, CreateContext, CreationError, Creator, DocumentError, Handle};

use crate::document::FaultyDocument;

/// Object kind written by probe creators.
pub const PROBE_OBJECT_KIND: &str = "probe";

/// Variant handled by [`ProbeCreator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe;

impl ComponentKind for Probe {
    const NAME: &'static str = "probe";
}

/// Variant handled by [`HostedProbeCreator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostedProbe;

impl ComponentKind for HostedProbe {
    const NAME: &'static str = "hosted-probe";
}

/// What a probe creator does when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeBehavior {
    /// Insert an object and return its handle.
    #[default]
    Create,
    /// Return `Ok(None)` without touching the document.
    Decline,
    /// Insert an object, then fail.
    Fail,
    /// Insert an object, then panic.
    Panic,
}

/// Shared record of probe invocations.
#[derive(Clone, Default)]
pub struct ProbeLog {
    inner: Arc<Mutex<ProbeLogInner>>,
}

#[derive(Default)]
struct ProbeLogInner {
    behavior: ProbeBehavior,
    references: Vec<Option<Handle>>,
}

impl ProbeLog {
    /// Empty log with [`ProbeBehavior::Create`].
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProbeLogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Changes the behaviour of every creator sharing this log.
    pub fn set_behavior(&self, behavior: ProbeBehavior) {
        self.lock().behavior = behavior;
    }

    /// Number of creator invocations.
    pub fn calls(&self) -> usize {
        self.lock().references.len()
    }

    /// Reference handle passed to each invocation, in call order.
    pub fn references(&self) -> Vec<Option<Handle>> {
        self.lock().references.clone()
    }

    #[allow(clippy::panic)]
    fn run(&self, cx: CreateContext<'_, FaultyDocument>) -> Result<Option<Handle>, CreationError> {
        let behavior = {
            let mut inner = self.lock();
            inner.references.push(cx.reference);
            inner.behavior
        };
        if behavior == ProbeBehavior::Decline {
            return Ok(None);
        }
        let payload = Bytes::copy_from_slice(cx.component.identity().as_str().as_bytes());
        let handle = cx
            .document
            .insert_object(cx.tx, PROBE_OBJECT_KIND, payload)?;
        match behavior {
            ProbeBehavior::Fail => Err(CreationError::Document(DocumentError::Other(
                "probe failure".into(),
            ))),
            ProbeBehavior::Panic => panic!("probe panic"),
            ProbeBehavior::Create | ProbeBehavior::Decline => Ok(Some(handle)),
        }
    }
}

/// Creator for [`Probe`]; never asks for a reference.
#[derive(Clone, Default)]
pub struct ProbeCreator {
    log: ProbeLog,
}

impl ProbeCreator {
    /// Creator recording into `log`.
    pub fn new(log: ProbeLog) -> Self {
        Self { log }
    }
}

impl Creator<FaultyDocument> for ProbeCreator {
    type Kind = Probe;

    fn create(
        &self,
        cx: CreateContext<'_, FaultyDocument>,
        _: &Probe,
    ) -> Result<Option<Handle>, CreationError> {
        self.log.run(cx)
    }
}

/// Creator for [`HostedProbe`]; asks for a reference.
#[derive(Clone, Default)]
pub struct HostedProbeCreator {
    log: ProbeLog,
}

impl HostedProbeCreator {
    /// Creator recording into `log`.
    pub fn new(log: ProbeLog) -> Self {
        Self { log }
    }
}

impl Creator<FaultyDocument> for HostedProbeCreator {
    type Kind = HostedProbe;

    const WANTS_REFERENCE: bool = true;

    fn create(
        &self,
        cx: CreateContext<'_, FaultyDocument>,
        _: &HostedProbe,
    ) -> Result<Option<Handle>, CreationError> {
        self.log.run(cx)
    }
}
