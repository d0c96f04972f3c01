//! Asynchronous call bookkeeping: the registry that dispatches completions,
//! and the completion values handed back to callers

mod completion;
mod registry;

pub use completion::{Canceled, Completion};
pub use registry::{CallError, CallRegistry};

pub(crate) use registry::IssuedCalls;
