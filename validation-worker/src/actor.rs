//! Actor that owns a validation engine
//!
//! The engine takes `&mut self` for batches, so a single task owns it and
//! callers talk to it through a cloneable [`WorkerHandle`]. Requests are
//! served one at a time in mailbox order.
//!
//! ```text
//! WorkerHandle (Clone) --mpsc (bounded)--> ValidationActor --> ValidationEngine
//!        ^                                       |
//!        +------- mpsc (unbounded) responses ----+
//! ```

use crate::message::{WorkerRequest, WorkerResponse};
use crate::{Error, Result};
use invoice_validation::ValidationEngine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Message sent to the validation actor
#[derive(Debug)]
pub enum WorkerMessage {
    /// Serve a request; every response goes to `events`, which is dropped
    /// after the terminal response
    Request {
        /// Decoded request
        request: WorkerRequest,
        /// Response sink
        events: mpsc::UnboundedSender<WorkerResponse>,
    },

    /// Stop the actor
    Shutdown,
}

/// Actor that processes worker requests
#[derive(Debug)]
pub struct ValidationActor {
    engine: ValidationEngine,
    mailbox: mpsc::Receiver<WorkerMessage>,
}

impl ValidationActor {
    /// Create new actor
    pub fn new(engine: ValidationEngine, mailbox: mpsc::Receiver<WorkerMessage>) -> Self {
        Self { engine, mailbox }
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(message) = self.mailbox.recv().await {
            match message {
                WorkerMessage::Shutdown => break,
                WorkerMessage::Request { request, events } => {
                    self.handle_request(request, &events).await;
                }
            }
        }

        info!("Validation actor stopped");
    }

    async fn handle_request(
        &mut self,
        request: WorkerRequest,
        events: &mpsc::UnboundedSender<WorkerResponse>,
    ) {
        debug!(kind = request.kind(), "Handling worker request");

        let response = match request {
            WorkerRequest::Validate { data } => {
                let progress = events.clone();
                let outcome = self
                    .engine
                    .validate_batch_with_progress(&data.records, |update| {
                        let _ = progress.send(WorkerResponse::Progress {
                            data: update.clone(),
                        });
                    })
                    .await;

                match outcome {
                    Ok(summary) => WorkerResponse::Complete { data: summary },
                    Err(e) => {
                        warn!(error = %e, "Batch validation failed");
                        WorkerResponse::error(e)
                    }
                }
            }

            WorkerRequest::ValidateRecord { data } => WorkerResponse::RecordResults {
                data: self.engine.validate_record(&data.record),
            },

            WorkerRequest::UpdateConfig { data } => match self.engine.update_config(&data) {
                Ok(()) => WorkerResponse::ConfigUpdated {
                    data: self.engine.config().clone(),
                },
                Err(e) => {
                    warn!(error = %e, "Configuration update rejected");
                    WorkerResponse::error(e)
                }
            },

            WorkerRequest::Statistics => WorkerResponse::Statistics {
                data: self.engine.statistics(),
            },

            WorkerRequest::Metrics => match self.engine.metrics().encode() {
                Ok(text) => WorkerResponse::Metrics { data: text },
                Err(e) => WorkerResponse::error(e),
            },

            WorkerRequest::Clear => {
                self.engine.clear_results();
                WorkerResponse::Cleared
            }
        };

        // Receiver may already be gone; nothing to report to.
        let _ = events.send(response);
    }
}

/// Handle for sending requests to the actor
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WorkerMessage>) -> Self {
        Self { sender }
    }

    /// Spawn an actor around `engine` and return a handle to it
    pub fn spawn(engine: ValidationEngine, mailbox_capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mailbox) = mpsc::channel(mailbox_capacity.max(1));
        let task = tokio::spawn(ValidationActor::new(engine, mailbox).run());
        (Self::new(sender), task)
    }

    /// Queue a request; the receiver yields its responses and closes after
    /// the terminal one
    pub async fn submit(
        &self,
        request: WorkerRequest,
    ) -> Result<mpsc::UnboundedReceiver<WorkerResponse>> {
        let (events, responses) = mpsc::unbounded_channel();
        self.sender
            .send(WorkerMessage::Request { request, events })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        Ok(responses)
    }

    /// Submit a request and collect every response
    pub async fn request(&self, request: WorkerRequest) -> Result<Vec<WorkerResponse>> {
        let mut responses = self.submit(request).await?;
        let mut collected = Vec::new();
        while let Some(response) = responses.recv().await {
            collected.push(response);
        }

        if collected.is_empty() {
            return Err(Error::Concurrency("Response channel closed".to_string()));
        }
        Ok(collected)
    }

    /// Submit a request and return only its terminal response
    pub async fn call(&self, request: WorkerRequest) -> Result<WorkerResponse> {
        self.request(request)
            .await?
            .pop()
            .ok_or_else(|| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Ask the actor to stop after the requests already queued
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WorkerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}
