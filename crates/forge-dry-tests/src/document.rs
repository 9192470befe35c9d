// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Document wrapper with failure injection and call counters.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use forge_core::{
    Document, DocumentError, Handle, MemoryDocument, Metadata, ObjectRecord, Parameter, TxId,
};

/// Shared fault switches and counters for a [`FaultyDocument`].
///
/// Clones share state, so a test keeps one clone while the session owns the
/// document.
#[derive(Clone, Default)]
pub struct FaultPlan {
    inner: Arc<Mutex<FaultPlanInner>>,
}

#[derive(Default)]
struct FaultPlanInner {
    fail_begin: bool,
    fail_commit: bool,
    fail_metadata: bool,
    reject_parameter: Option<String>,
    begins: usize,
    commits: usize,
    aborts: usize,
    max_live: usize,
    live: usize,
}

impl FaultPlan {
    /// Create a plan with every fault disabled.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FaultPlanInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `begin` fail.
    pub fn set_fail_begin(&self, fail: bool) {
        self.lock().fail_begin = fail;
    }

    /// Make `commit` fail (the transaction stays live so it can be aborted).
    pub fn set_fail_commit(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }

    /// Make `attach_metadata` fail.
    pub fn set_fail_metadata(&self, fail: bool) {
        self.lock().fail_metadata = fail;
    }

    /// Reject any parameter with this name.
    pub fn reject_parameter(&self, name: Option<&str>) {
        self.lock().reject_parameter = name.map(str::to_owned);
    }

    /// Number of successful `begin` calls.
    pub fn begins(&self) -> usize {
        self.lock().begins
    }

    /// Number of successful `commit` calls.
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    /// Number of `abort` calls on a live transaction.
    pub fn aborts(&self) -> usize {
        self.lock().aborts
    }

    /// Highest number of simultaneously live transactions observed.
    pub fn max_live(&self) -> usize {
        self.lock().max_live
    }
}

/// [`MemoryDocument`] with scripted failures.
pub struct FaultyDocument {
    inner: MemoryDocument,
    plan: FaultPlan,
}

impl FaultyDocument {
    /// Wrap an empty document; returns the document and the shared plan.
    pub fn new() -> (Self, FaultPlan) {
        Self::wrap(MemoryDocument::new())
    }

    /// Wrap an existing document.
    pub fn wrap(inner: MemoryDocument) -> (Self, FaultPlan) {
        let plan = FaultPlan::new();
        (
            Self {
                inner,
                plan: plan.clone(),
            },
            plan,
        )
    }

    /// Native creation primitive (delegates to [`MemoryDocument::insert_object`]).
    pub fn insert_object(
        &mut self,
        tx: TxId,
        kind: &'static str,
        payload: Bytes,
    ) -> Result<Handle, DocumentError> {
        self.inner.insert_object(tx, kind, payload)
    }

    /// Object lookup.
    pub fn object(&self, handle: Handle) -> Option<&ObjectRecord> {
        self.inner.object(handle)
    }

    /// Wrapped document.
    pub fn inner(&self) -> &MemoryDocument {
        &self.inner
    }

    /// Unwrap into the inner document.
    pub fn into_inner(self) -> MemoryDocument {
        self.inner
    }
}

impl Document for FaultyDocument {
    fn begin(&mut self) -> Result<TxId, DocumentError> {
        if self.plan.lock().fail_begin {
            return Err(DocumentError::Other("simulated begin failure".into()));
        }
        let tx = self.inner.begin()?;
        let mut plan = self.plan.lock();
        plan.begins += 1;
        plan.live += 1;
        plan.max_live = plan.max_live.max(plan.live);
        Ok(tx)
    }

    fn commit(&mut self, tx: TxId) -> Result<(), DocumentError> {
        if self.plan.lock().fail_commit {
            return Err(DocumentError::CommitRejected("simulated commit failure".into()));
        }
        self.inner.commit(tx)?;
        let mut plan = self.plan.lock();
        plan.commits += 1;
        plan.live = plan.live.saturating_sub(1);
        Ok(())
    }

    fn abort(&mut self, tx: TxId) {
        if self.inner.live_tx() == Some(tx) {
            let mut plan = self.plan.lock();
            plan.aborts += 1;
            plan.live = plan.live.saturating_sub(1);
        }
        self.inner.abort(tx);
    }

    fn contains(&self, handle: Handle) -> bool {
        self.inner.contains(handle)
    }

    fn apply_parameter(
        &mut self,
        tx: TxId,
        handle: Handle,
        parameter: &Parameter,
    ) -> Result<(), DocumentError> {
        if self.plan.lock().reject_parameter.as_deref() == Some(parameter.name.as_str()) {
            return Err(DocumentError::ParameterRejected {
                name: parameter.name.clone(),
                reason: "simulated rejection".into(),
            });
        }
        self.inner.apply_parameter(tx, handle, parameter)
    }

    fn attach_metadata(
        &mut self,
        tx: TxId,
        handle: Handle,
        metadata: &Metadata,
    ) -> Result<(), DocumentError> {
        if self.plan.lock().fail_metadata {
            return Err(DocumentError::Other("simulated metadata failure".into()));
        }
        self.inner.attach_metadata(tx, handle, metadata)
    }

    fn tagged_objects(&self) -> Vec<(Handle, Metadata)> {
        self.inner.tagged_objects()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn failed_commit_leaves_tx_abortable() {
        let (mut doc, plan) = FaultyDocument::new();
        plan.set_fail_commit(true);
        let tx = doc.begin().unwrap();
        doc.insert_object(tx, "probe", Bytes::new()).unwrap();
        assert!(doc.commit(tx).is_err());
        doc.abort(tx);
        assert!(doc.inner().is_empty());
        assert_eq!((plan.begins(), plan.commits(), plan.aborts()), (1, 0, 1));
    }

    #[test]
    fn counters_track_live_transactions() {
        let (mut doc, plan) = FaultyDocument::new();
        let tx = doc.begin().unwrap();
        doc.commit(tx).unwrap();
        let tx = doc.begin().unwrap();
        doc.abort(tx);
        doc.abort(tx);
        assert_eq!(plan.aborts(), 1, "abort of a closed tx is not counted");
        assert_eq!(plan.max_live(), 1);
    }
}
