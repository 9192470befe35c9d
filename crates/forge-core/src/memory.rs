// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory transactional document used by the demo variants and tests.
use std::collections::BTreeMap;

use bytes::Bytes;

use crate::component::{Parameter, ParameterValue};
use crate::document::{Document, DocumentError, Handle, Metadata};
use crate::tx::TxId;

/// Materialised object stored in a [`MemoryDocument`].
///
/// Invariants
/// - `kind` is the native object kind chosen by the creating capability.
/// - `payload` encoding is capability-defined and opaque to the document.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRecord {
    /// Native object kind (e.g. `"line"`).
    pub kind: &'static str,
    /// Geometry or other native data.
    pub payload: Bytes,
    /// Applied parameter values keyed by name (last write wins).
    pub parameters: BTreeMap<String, ParameterValue>,
    /// Attached metadata records in attach order.
    pub metadata: Vec<Metadata>,
}

#[derive(Clone, Default)]
struct Contents {
    objects: BTreeMap<Handle, ObjectRecord>,
}

/// In-memory document with snapshot/restore transactions.
///
/// Beginning a transaction snapshots the object table; abort restores the
/// snapshot and commit drops it. Handles are issued monotonically and are
/// never reused, not even after an abort.
#[derive(Default)]
pub struct MemoryDocument {
    contents: Contents,
    live: Option<(TxId, Contents)>,
    tx_counter: TxId,
    high_water: u64,
}

impl MemoryDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Native creation primitive: inserts a new object under `tx`.
    ///
    /// # Errors
    /// Returns [`DocumentError::UnknownTx`] if `tx` is not the live transaction.
    pub fn insert_object(
        &mut self,
        tx: TxId,
        kind: &'static str,
        payload: Bytes,
    ) -> Result<Handle, DocumentError> {
        self.check_live(tx)?;
        self.high_water += 1;
        let handle = Handle::from_raw(self.high_water);
        self.contents.objects.insert(
            handle,
            ObjectRecord {
                kind,
                payload,
                parameters: BTreeMap::new(),
                metadata: Vec::new(),
            },
        );
        Ok(handle)
    }

    /// Returns a shared view of an object when it exists.
    #[must_use]
    pub fn object(&self, handle: Handle) -> Option<&ObjectRecord> {
        self.contents.objects.get(&handle)
    }

    /// Number of objects currently visible.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.objects.len()
    }

    /// Returns `true` when the document holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.objects.is_empty()
    }

    /// Returns the live transaction, if any.
    #[must_use]
    pub fn live_tx(&self) -> Option<TxId> {
        self.live.as_ref().map(|(tx, _)| *tx)
    }

    fn check_live(&self, tx: TxId) -> Result<(), DocumentError> {
        match &self.live {
            Some((live, _)) if *live == tx && !tx.is_reserved() => Ok(()),
            _ => Err(DocumentError::UnknownTx(tx)),
        }
    }

    fn object_mut(&mut self, handle: Handle) -> Result<&mut ObjectRecord, DocumentError> {
        self.contents
            .objects
            .get_mut(&handle)
            .ok_or(DocumentError::UnknownHandle(handle))
    }
}

impl Document for MemoryDocument {
    fn begin(&mut self) -> Result<TxId, DocumentError> {
        if let Some((open, _)) = &self.live {
            return Err(DocumentError::TransactionOpen(*open));
        }
        self.tx_counter = self.tx_counter.next();
        self.live = Some((self.tx_counter, self.contents.clone()));
        Ok(self.tx_counter)
    }

    fn commit(&mut self, tx: TxId) -> Result<(), DocumentError> {
        self.check_live(tx)?;
        self.live = None;
        Ok(())
    }

    fn abort(&mut self, tx: TxId) {
        if self.check_live(tx).is_err() {
            return;
        }
        if let Some((_, before)) = self.live.take() {
            self.contents = before;
        }
    }

    fn contains(&self, handle: Handle) -> bool {
        self.contents.objects.contains_key(&handle)
    }

    fn apply_parameter(
        &mut self,
        tx: TxId,
        handle: Handle,
        parameter: &Parameter,
    ) -> Result<(), DocumentError> {
        self.check_live(tx)?;
        let record = self.object_mut(handle)?;
        record
            .parameters
            .insert(parameter.name.clone(), parameter.value.clone());
        Ok(())
    }

    fn attach_metadata(
        &mut self,
        tx: TxId,
        handle: Handle,
        metadata: &Metadata,
    ) -> Result<(), DocumentError> {
        self.check_live(tx)?;
        self.object_mut(handle)?.metadata.push(metadata.clone());
        Ok(())
    }

    fn tagged_objects(&self) -> Vec<(Handle, Metadata)> {
        // Uncommitted objects are invisible to bootstrap.
        let committed = match &self.live {
            Some((_, before)) => &before.objects,
            None => &self.contents.objects,
        };
        committed
            .iter()
            .flat_map(|(handle, record)| record.metadata.iter().map(|m| (*handle, m.clone())))
            .collect()
    }
}
