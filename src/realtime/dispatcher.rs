use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::event::model::DomainEvent;
use crate::notification::model::Notification;
use crate::realtime::gateway::RealtimeGateway;
use crate::realtime::router::RouteJobs;

/// A unit of broadcast work handed across the async boundary.
///
/// Notification jobs carry the persisted row; feed jobs carry the ephemeral
/// event. Either way the payload is built from current entity state when the
/// worker gets to the job, not when it was enqueued.
#[derive(Debug, Clone)]
pub enum DispatchJob {
    Notification(Notification),
    Feed(DomainEvent),
}

/// Fire-and-forget publisher decoupled from the request path.
///
/// Jobs are queued onto a bounded channel and drained by a single worker
/// task, so per-recipient enqueue order follows commit order. When the queue
/// is full the job is dropped and logged; delivery is best-effort and the
/// triggering write has already succeeded.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    tx: mpsc::Sender<DispatchJob>,
}

impl BroadcastDispatcher {
    pub fn start(
        router: Arc<dyn RouteJobs>,
        gateway: Arc<RealtimeGateway>,
        capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<DispatchJob>(capacity);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match router.route(&job).await {
                    Ok(routes) => {
                        for (topic, payload) in routes {
                            gateway.publish(&topic, &payload);
                        }
                    }
                    Err(e) => {
                        // Delivery failure only; the notification row (if
                        // any) is already durable.
                        error!("Failed to route dispatch job: {}", e);
                    }
                }
            }
            debug!("Broadcast dispatch worker stopped");
        });

        Self { tx }
    }

    /// Enqueue without blocking and without surfacing errors to the caller.
    pub fn enqueue(&self, job: DispatchJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!("Dispatch queue full, dropping {}", job_label(&job));
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!("Dispatch worker gone, dropping {}", job_label(&job));
            }
        }
    }
}

fn job_label(job: &DispatchJob) -> String {
    match job {
        DispatchJob::Notification(n) => format!("notification {} ({})", n.id, n.action),
        DispatchJob::Feed(e) => format!("feed event {:?}", e.kind),
    }
}
