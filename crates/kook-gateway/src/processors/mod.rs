//! Event processors

mod chain;

pub use chain::{PreProcessorFn, ProcessorChain, ProcessorFn, ProcessorList};
