//! The per-execution capability object, `spec.md` §4.4: handed to the user's
//! transaction body, multiplexing MVMM reads with base-store fallback and
//! recording read/write descriptors as it goes.

use crate::base_store::BaseStore;
use crate::error::ExecError;
use crate::io::{DescriptorBuffer, ReadDescriptor, TxnInput, TxnOutput, WriteDescriptor};
use crate::key::{Key, Value};
use crate::mvmm::{Mvmm, ReadResult};
use crate::version::Version;

/// The read/write capability handed to one execution of one transaction
/// body.
///
/// Reads consult the MVMM first; on a miss they fall through to the base
/// store. Every non-aborting read and every write is buffered into a
/// [`DescriptorBuffer`] (first-read-wins, last-write-wins per `spec.md`
/// §4.2/§4.4) until [`ExecutionView::finish`] materializes it. The view does
/// not deduplicate descriptors *across* executions — a fresh view is built
/// for every incarnation.
pub struct ExecutionView<'a, S: BaseStore> {
    mvmm: &'a Mvmm,
    base_store: &'a S,
    version: Version,
    buffer: DescriptorBuffer,
}

impl<'a, S: BaseStore> ExecutionView<'a, S> {
    /// Builds a view for one execution at `version`, reading/writing through
    /// `mvmm` and falling back to `base_store`.
    pub fn new(mvmm: &'a Mvmm, base_store: &'a S, version: Version) -> Self {
        Self { mvmm, base_store, version, buffer: DescriptorBuffer::new() }
    }

    /// Reads `key`.
    ///
    /// - MVMM `Done` → returns the value, recording a `Map`-kind descriptor.
    /// - MVMM `Dependency` → aborts this execution with
    ///   [`ExecError::Aborted`]; the caller (the worker loop) converts this
    ///   into a requeue, never surfacing it past the batch.
    /// - MVMM `None` → falls through to the base store, recording a
    ///   `Storage`-kind descriptor.
    pub fn read(&mut self, key: &Key) -> Result<Option<Value>, ExecError<S::Error>> {
        match self.mvmm.read(key, self.version.tx_idx) {
            ReadResult::Done { dep_idx, incarnation, value } => {
                self.buffer.record_read(ReadDescriptor::map(
                    key.clone(),
                    Version::new(dep_idx, incarnation),
                ));
                Ok(Some(value))
            }
            ReadResult::Dependency { dep_idx } => {
                Err(ExecError::Aborted { blocking_tx_idx: dep_idx })
            }
            ReadResult::None => {
                let value = self.base_store.read(key).map_err(ExecError::Fatal)?;
                self.buffer.record_read(ReadDescriptor::storage(key.clone()));
                Ok(value)
            }
        }
    }

    /// Writes `value` at `key` through the MVMM, recording a write
    /// descriptor (last-write-wins within this execution).
    ///
    /// The only fatal condition here is a broken scheduler invariant (a
    /// non-increasing incarnation), surfaced as [`crate::mvmm::MvmmError`]
    /// via `From` into the caller's fatal-error type at the orchestrator
    /// boundary — not something a transaction body can trigger through
    /// ordinary use.
    pub fn write(&mut self, key: &Key, value: Value) -> Result<(), crate::mvmm::MvmmError> {
        self.mvmm.write(key, self.version, value.clone())?;
        self.buffer.record_write(WriteDescriptor { path: key.clone(), version: self.version, value });
        Ok(())
    }

    /// Consumes the view, returning the materialized read and write sets
    /// for this execution.
    pub fn finish(self) -> (TxnInput, TxnOutput) {
        self.buffer.into_input_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::value_of;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore(Mutex<HashMap<Key, Value>>);

    impl BaseStore for MemStore {
        type Error = std::convert::Infallible;

        fn read(&self, key: &Key) -> Result<Option<Value>, Self::Error> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        fn write(&self, key: &Key, value: Value) -> Result<(), Self::Error> {
            self.0.lock().unwrap().insert(key.clone(), value);
            Ok(())
        }
    }

    #[test]
    fn read_falls_through_to_base_store_on_miss() {
        let mvmm = Mvmm::new();
        let store = MemStore::default();
        store.write(&Key::from("k"), value_of(vec![7])).unwrap();
        let mut view = ExecutionView::new(&mvmm, &store, Version::new(3, 0));
        let value = view.read(&Key::from("k")).unwrap();
        assert_eq!(value, Some(value_of(vec![7])));
        let (input, _) = view.finish();
        assert_eq!(input.reads().len(), 1);
    }

    #[test]
    fn read_returns_done_from_mvmm() {
        let mvmm = Mvmm::new();
        mvmm.write(&Key::from("k"), Version::new(0, 0), value_of(vec![1])).unwrap();
        let store = MemStore::default();
        let mut view = ExecutionView::new(&mvmm, &store, Version::new(3, 0));
        let value = view.read(&Key::from("k")).unwrap();
        assert_eq!(value, Some(value_of(vec![1])));
    }

    #[test]
    fn read_aborts_on_dependency() {
        let mvmm = Mvmm::new();
        mvmm.write(&Key::from("k"), Version::new(0, 0), value_of(vec![1])).unwrap();
        mvmm.mark_estimate(&Key::from("k"), 0).unwrap();
        let store = MemStore::default();
        let mut view = ExecutionView::new(&mvmm, &store, Version::new(3, 0));
        let err = view.read(&Key::from("k")).unwrap_err();
        assert!(matches!(err, ExecError::Aborted { blocking_tx_idx: 0 }));
    }

    #[test]
    fn first_read_wins_even_after_a_later_write() {
        let mvmm = Mvmm::new();
        let store = MemStore::default();
        let mut view = ExecutionView::new(&mvmm, &store, Version::new(3, 0));
        let _ = view.read(&Key::from("k")).unwrap();
        view.write(&Key::from("k"), value_of(vec![2])).unwrap();
        let _ = view.read(&Key::from("k"));
        let (input, output) = view.finish();
        assert_eq!(input.reads().len(), 1);
        assert_eq!(input.reads()[0].kind, crate::io::ReadKind::Storage);
        assert_eq!(output.writes().len(), 1);
    }
}
