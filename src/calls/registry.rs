//! Correlates in-flight platform calls with their single completion.
//!
//! Owners register a typed callback for each handle they issue. [`CallRegistry::pump`]
//! polls the transport and dispatches every reported completion to its callback
//! exactly once, removing the registration before the callback runs. Callbacks
//! may register new calls (for example, a flush chaining a refresh); those are
//! dispatched on a later pump, never within the pump that registered them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, warn};

use crate::domain::{CallHandle, CallKind};
use crate::service::{CallPayload, CompletedCall, FromPayload, PlatformService};

/// Error type for call registration
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("call handle {0} is already registered")]
    DuplicateHandle(CallHandle),
}

type Callback = Box<dyn FnOnce(CallPayload, bool) + Send>;

/// A registered call awaiting its completion
struct PendingCall {
    kind: CallKind,
    callback: Callback,
}

/// Registry of in-flight calls
///
/// Cheap to clone; clones share the same set of pending calls.
#[derive(Clone, Default)]
pub struct CallRegistry {
    pending: Arc<Mutex<HashMap<CallHandle, PendingCall>>>,
}

impl std::fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallRegistry")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallHandle, PendingCall>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Associate a handle with its completion callback
    ///
    /// The callback receives the typed result and the IO-failure flag. When the
    /// flag is set the result is `T::default()` and must not be trusted.
    pub fn register<T, F>(&self, handle: CallHandle, on_complete: F) -> Result<(), CallError>
    where
        T: FromPayload,
        F: FnOnce(T, bool) + Send + 'static,
    {
        let mut pending = self.lock();
        if pending.contains_key(&handle) {
            error!(%handle, kind = %T::KIND, "refusing to register a handle twice");
            return Err(CallError::DuplicateHandle(handle));
        }

        let callback: Callback = Box::new(move |payload, io_failure| {
            if io_failure {
                on_complete(T::default(), true);
                return;
            }
            let received = payload.kind();
            match T::from_payload(payload) {
                Some(result) => on_complete(result, false),
                None => {
                    error!(
                        expected = %T::KIND,
                        received = ?received,
                        "completion payload does not match the registered call"
                    );
                    on_complete(T::default(), true);
                }
            }
        });

        pending.insert(
            handle,
            PendingCall {
                kind: T::KIND,
                callback,
            },
        );
        debug!(%handle, kind = %T::KIND, "call registered");
        Ok(())
    }

    /// Poll the transport and dispatch every completed call
    ///
    /// Never blocks. Returns the number of callbacks invoked. A completion for a
    /// handle that is not registered is logged and discarded.
    pub fn pump(&self, service: &dyn PlatformService) -> usize {
        let completed = service.poll_completed();
        let mut dispatched = 0;

        for CompletedCall {
            handle,
            io_failure,
            payload,
        } in completed
        {
            // Removed (and the lock released) before the callback runs, so a handle
            // can never fire twice and callbacks are free to register new calls.
            let removed = self.lock().remove(&handle);
            let Some(call) = removed else {
                error!(%handle, "transport reported completion of an unknown call; discarding");
                continue;
            };

            if io_failure {
                warn!(%handle, kind = %call.kind, "call failed at the transport level");
            } else {
                debug!(%handle, kind = %call.kind, "call completed");
            }

            (call.callback)(payload, io_failure);
            dispatched += 1;
        }

        dispatched
    }

    /// Drop a registration without invoking its callback
    ///
    /// Returns `false` if the handle was not pending (already dispatched or unknown).
    pub fn abandon(&self, handle: CallHandle) -> bool {
        let removed = self.lock().remove(&handle);
        match removed {
            Some(call) => {
                debug!(%handle, kind = %call.kind, "call abandoned");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: CallHandle) -> bool {
        self.lock().contains_key(&handle)
    }

    /// Number of calls awaiting completion
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

/// Handles issued by one owner, so they can be abandoned on teardown
#[derive(Debug, Default)]
pub(crate) struct IssuedCalls {
    handles: Vec<CallHandle>,
}

impl IssuedCalls {
    /// Remember a handle, forgetting those that already completed
    pub(crate) fn track(&mut self, registry: &CallRegistry, handle: CallHandle) {
        self.handles.retain(|h| registry.is_pending(*h));
        self.handles.push(handle);
    }

    /// Abandon every still-pending handle; returns how many were abandoned
    pub(crate) fn abandon_all(&mut self, registry: &CallRegistry) -> usize {
        self.handles
            .drain(..)
            .filter(|h| registry.abandon(*h))
            .count()
    }
}
