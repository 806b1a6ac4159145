//! Pre-processor and processor chains
//!
//! Pre-processors run synchronously in registration order. Processors run
//! asynchronously, in order, once per event. Every callback is guarded so a
//! failure or panic only affects itself.

use crate::error::ProcessorError;
use crate::events::{EventSignal, LazyEvent};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Synchronous callback run before the processors
pub type PreProcessorFn = dyn Fn(&EventSignal, &LazyEvent) -> Result<(), ProcessorError> + Send + Sync;

/// Asynchronous event callback
pub type ProcessorFn =
    dyn Fn(Arc<EventSignal>, Arc<LazyEvent>) -> BoxFuture<'static, Result<(), ProcessorError>> + Send + Sync;

/// Snapshot of the registered processors
pub type ProcessorList = Vec<Arc<ProcessorFn>>;

/// Append-only callback lists
#[derive(Default)]
pub struct ProcessorChain {
    pre_processors: RwLock<Vec<Arc<PreProcessorFn>>>,
    processors: RwLock<ProcessorList>,
}

impl ProcessorChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-processor
    pub fn register_pre_processor<F>(&self, pre_processor: F)
    where
        F: Fn(&EventSignal, &LazyEvent) -> Result<(), ProcessorError> + Send + Sync + 'static,
    {
        self.pre_processors.write().push(Arc::new(pre_processor));
    }

    /// Append a processor
    pub fn register_processor<F, Fut>(&self, processor: F)
    where
        F: Fn(Arc<EventSignal>, Arc<LazyEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
    {
        let boxed: Arc<ProcessorFn> = Arc::new(move |signal, lazy| processor(signal, lazy).boxed());
        self.processors.write().push(boxed);
    }

    /// Check if nothing at all is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_processors.read().is_empty() && self.processors.read().is_empty()
    }

    #[must_use]
    pub fn has_processors(&self) -> bool {
        !self.processors.read().is_empty()
    }

    #[must_use]
    pub fn pre_processor_count(&self) -> usize {
        self.pre_processors.read().len()
    }

    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.read().len()
    }

    /// Copy of the current processor list
    #[must_use]
    pub fn processors(&self) -> ProcessorList {
        self.processors.read().clone()
    }

    /// Run every pre-processor in order, returning how many failed
    pub fn run_pre_processors(&self, signal: &EventSignal, lazy: &LazyEvent) -> usize {
        let snapshot = self.pre_processors.read().clone();
        let mut failures = 0;

        for (index, pre_processor) in snapshot.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| pre_processor(signal, lazy)))
                .unwrap_or_else(|payload| Err(ProcessorError::Panicked(panic_message(&*payload))));

            if let Err(e) = outcome {
                failures += 1;
                tracing::warn!(
                    sn = signal.sn,
                    index,
                    error = %e,
                    "Pre-processor failed"
                );
            }
        }

        failures
    }

    /// Run a processor list in order, returning how many failed
    pub async fn run_processors(
        processors: ProcessorList,
        signal: Arc<EventSignal>,
        lazy: Arc<LazyEvent>,
    ) -> usize {
        let mut failures = 0;

        for (index, processor) in processors.iter().enumerate() {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
                processor(signal.clone(), lazy.clone())
            })) {
                Ok(future) => AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ProcessorError::Panicked(panic_message(&*payload)))),
                Err(payload) => Err(ProcessorError::Panicked(panic_message(&*payload))),
            };

            if let Err(e) = outcome {
                failures += 1;
                tracing::warn!(
                    sn = signal.sn,
                    index,
                    error = %e,
                    "Processor failed"
                );
            }
        }

        failures
    }
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("pre_processors", &self.pre_processor_count())
            .field("processors", &self.processor_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
