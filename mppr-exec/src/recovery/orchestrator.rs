use std::sync::Arc;

use mppr_core::{MemTracker, RecoveryConfig, ResultBatch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{Event, EventSink, NoOpEventSink};
use crate::holder::{HolderState, ResultHolder};
use crate::recovery::{MemLimitHandler, RecoveryError, RecoveryHandler, RecoveryRequest};
use crate::topology::TopologyFetcher;

/// Recovery coordinator for one query-execution context.
///
/// Owns the handler chain, the result holder and the retry budget. Every mutating method takes
/// `&mut self`; sharing an orchestrator across threads requires an outer lock.
pub struct RecoveryOrchestrator<B> {
    context_id: Uuid,
    enabled: bool,
    handlers: Vec<Box<dyn RecoveryHandler>>,
    holder: ResultHolder<B>,
    cur_recovery_count: u32,
    max_recovery_count: u32,
    events: Arc<dyn EventSink>,
}

impl<B: ResultBatch> RecoveryOrchestrator<B> {
    /// Builds the default chain: a single memory-limit handler backed by `fetcher`.
    pub fn new(
        config: &RecoveryConfig,
        fetcher: Arc<dyn TopologyFetcher>,
        parent: Option<&Arc<MemTracker>>,
    ) -> Self {
        let handlers: Vec<Box<dyn RecoveryHandler>> =
            vec![Box::new(MemLimitHandler::new(config.use_auto_scaler, fetcher))];
        Self::with_handlers(config, handlers, parent)
    }

    /// Handlers are consulted in the given order; the first one that classifies a failure wins.
    pub fn with_handlers(
        config: &RecoveryConfig,
        handlers: Vec<Box<dyn RecoveryHandler>>,
        parent: Option<&Arc<MemTracker>>,
    ) -> Self {
        Self {
            context_id: Uuid::new_v4(),
            enabled: config.enable,
            handlers,
            holder: ResultHolder::new(config.holder_capacity, parent),
            cur_recovery_count: 0,
            max_recovery_count: config.max_recovery_count,
            events: Arc::new(NoOpEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_context_id(mut self, context_id: Uuid) -> Self {
        self.context_id = context_id;
        self
    }

    /// Appends a handler at the end of the chain.
    pub fn register_handler(&mut self, handler: Box<dyn RecoveryHandler>) {
        self.handlers.push(handler);
    }

    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn holder(&self) -> &ResultHolder<B> {
        &self.holder
    }

    pub fn can_hold_result(&self) -> bool {
        self.holder.can_hold()
    }

    /// Buffers a batch. Callers check [`Self::can_hold_result`] first.
    ///
    /// When recovery is disabled nothing is buffered and the batch is handed back.
    pub fn hold_result(&mut self, batch: B) -> Result<(), B> {
        if !self.enabled {
            return Err(batch);
        }
        let rows = batch.num_rows();
        let before = self.holder.state();
        self.holder.insert(batch);
        self.events.emit(Event::BatchHeld {
            context_id: self.context_id,
            rows,
            held_rows: self.holder.held_row_count(),
        });
        if before == HolderState::Holding && self.holder.state() == HolderState::Committing {
            self.events.emit(Event::HolderCommitted {
                context_id: self.context_id,
                held_rows: self.holder.held_row_count(),
                reason: "capacity",
            });
        }
        Ok(())
    }

    pub fn num_held_batches(&self) -> usize {
        self.holder.held_batch_count()
    }

    pub fn num_held_rows(&self) -> u64 {
        self.holder.held_row_count()
    }

    /// Hands the oldest buffered batch to the caller. Once anything is drained the holder
    /// stops accepting results until reset.
    pub fn pop_front_batch(&mut self) -> Option<B> {
        if !self.enabled {
            return None;
        }
        let before = self.holder.state();
        let batch = self.holder.pop_front()?;
        if before == HolderState::Holding {
            self.events.emit(Event::HolderCommitted {
                context_id: self.context_id,
                held_rows: self.holder.held_row_count(),
                reason: "drain",
            });
        }
        self.events.emit(Event::BatchDrained {
            context_id: self.context_id,
            rows: batch.num_rows(),
        });
        Some(batch)
    }

    /// Clears buffered results between attempts. Leaves `enabled`, capacity and the retry
    /// budget untouched.
    pub fn reset_holder(&mut self) {
        let discarded_batches = self.holder.held_batch_count();
        let discarded_rows = self.holder.held_row_count();
        self.holder.reset();
        self.events.emit(Event::HolderReset {
            context_id: self.context_id,
            discarded_batches,
            discarded_rows,
        });
    }

    pub fn recovery_count(&self) -> u32 {
        self.cur_recovery_count
    }

    pub fn max_recovery_count(&self) -> u32 {
        self.max_recovery_count
    }

    /// Tries to recover a worker failure. A call either succeeds or fails as a whole.
    ///
    /// The attempt is charged before a handler runs, so a handler whose corrective action
    /// fails still consumes one unit of the budget. Calls rejected because recovery is
    /// disabled, the request is malformed or the budget is spent are not charged.
    pub fn recovery(&mut self, request: Option<&RecoveryRequest>) -> Result<(), RecoveryError> {
        if !self.enabled {
            return Err(self.reject(RecoveryError::NotEnabled));
        }

        let (request, failure) = match request {
            Some(req) => match &req.failure {
                Some(failure) => (req, failure),
                None => return Err(self.reject(RecoveryError::InvalidInput)),
            },
            None => return Err(self.reject(RecoveryError::InvalidInput)),
        };

        if self.cur_recovery_count >= self.max_recovery_count {
            return Err(self.reject(RecoveryError::BudgetExceeded {
                current: self.cur_recovery_count,
                max: self.max_recovery_count,
            }));
        }

        self.cur_recovery_count += 1;
        let attempt = self.cur_recovery_count;
        info!(
            context_id = %self.context_id,
            attempt,
            max = self.max_recovery_count,
            node_count = request.node_count,
            error = %failure,
            "attempting mpp error recovery"
        );
        self.events.emit(Event::RecoveryStarted {
            context_id: self.context_id,
            attempt,
            node_count: request.node_count,
        });

        let Some(handler) = self.handlers.iter().find(|h| h.classify(&**failure)) else {
            warn!(context_id = %self.context_id, attempt, "no handler to recover failure");
            let err = RecoveryError::Unclassified;
            self.events.emit(Event::RecoveryFailed {
                context_id: self.context_id,
                attempt,
                handler: None,
                error: err.to_string(),
            });
            return Err(err);
        };

        let name = handler.name();
        debug!(context_id = %self.context_id, attempt, handler = name, "handler chosen");
        match handler.recover(request) {
            Ok(()) => {
                info!(context_id = %self.context_id, attempt, handler = name, "recovery succeeded");
                self.events.emit(Event::RecoverySucceeded {
                    context_id: self.context_id,
                    attempt,
                    handler: name,
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    context_id = %self.context_id,
                    attempt,
                    handler = name,
                    error = %e,
                    "recovery action failed"
                );
                let err = RecoveryError::Handler(e);
                self.events.emit(Event::RecoveryFailed {
                    context_id: self.context_id,
                    attempt,
                    handler: Some(name),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn reject(&self, err: RecoveryError) -> RecoveryError {
        warn!(
            context_id = %self.context_id,
            reason = err.kind(),
            error = %err,
            "mpp error recovery rejected"
        );
        self.events.emit(Event::RecoveryRejected {
            context_id: self.context_id,
            reason: err.kind(),
            error: err.to_string(),
        });
        err
    }
}
