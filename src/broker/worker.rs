//! Presence-event worker (C5), translated from the original's
//! `internal/worker/evaluation.go`: a topic-exchange consumer that
//! recomputes and re-caches one user/region evaluation per message,
//! bounded by a semaphore instead of the unbounded goroutine-per-message
//! shape the Go code allows.

use crate::broker::{declare_topology, PresenceMessage, PRESENCE_CREATE_KEY, PRESENCE_EXCHANGE};
use crate::domain::EvaluateOpts;
use crate::errors::{CoreError, CoreResult, ErrorKind};
use crate::logger::{log, LogTag};
use crate::service::EvaluationService;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const HANDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the consumer channel and the concurrency/shutdown bookkeeping
/// around it. `Start` declares the topology, binds the worker queue, and
/// spawns the receive loop; `Stop` cancels the consumer and waits for
/// every in-flight handler to finish.
pub struct EvaluationWorker {
    channel: Channel,
    queue: String,
    concurrency: usize,
    service: Arc<EvaluationService>,
}

impl EvaluationWorker {
    pub async fn new(
        connection: &Connection,
        queue: String,
        concurrency: usize,
        service: Arc<EvaluationService>,
    ) -> CoreResult<Self> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(Self {
            channel,
            queue,
            concurrency,
            service,
        })
    }

    /// Declares the topology, binds the durable worker queue to
    /// `presence.create` (deletes invalidate synchronously via
    /// `CacheInvalidator` and don't need a recompute pass), sets prefetch
    /// to the configured concurrency, then consumes until the channel
    /// closes or `stop` is requested. Returns once every dispatched
    /// handler has completed — the async equivalent of the original's
    /// `sync.WaitGroup` drain.
    pub async fn run(&self, mut stop: tokio::sync::watch::Receiver<bool>) -> CoreResult<()> {
        declare_topology(&self.channel).await?;

        self.channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        self.channel
            .queue_bind(
                &self.queue,
                PRESENCE_EXCHANGE,
                PRESENCE_CREATE_KEY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        self.channel
            .basic_qos(self.concurrency as u16, BasicQosOptions::default())
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        let consumer_tag = format!("pumpkinlog-worker-{}", std::process::id());
        let mut consumer = self
            .channel
            .basic_consume(
                &self.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut inflight: JoinSet<()> = JoinSet::new();

        log(LogTag::Worker, "INFO", "presence worker started");

        loop {
            tokio::select! {
                biased;

                _ = stop.changed() => {
                    if *stop.borrow() {
                        break;
                    }
                }

                delivery = consumer.next() => {
                    let Some(delivery) = delivery else { break };
                    let delivery = match delivery {
                        Ok(d) => d,
                        Err(e) => {
                            log(LogTag::Worker, "ERROR", &format!("consumer error: {e}"));
                            continue;
                        }
                    };

                    let permit = Arc::clone(&semaphore).acquire_owned().await
                        .map_err(|e| CoreError::Internal(e.into()))?;
                    let service = Arc::clone(&self.service);

                    inflight.spawn(async move {
                        let _permit = permit;
                        handle_delivery(delivery, service).await;
                    });
                }
            }
        }

        log(LogTag::Worker, "INFO", "presence worker stopping, draining in-flight handlers");
        while inflight.join_next().await.is_some() {}
        log(LogTag::Worker, "INFO", "presence worker stopped");

        Ok(())
    }
}

/// What to do with a delivery once its handler has run to completion or
/// timed out.
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    Ack,
    NackRequeue,
}

/// §7's retry table: `NotFound`/`Validation` never retry (a presence
/// event for a deleted region or a malformed payload simply no-ops and
/// acks), only `Internal` failures and timeouts nack-with-requeue. Pure
/// so it can be tested without a live broker connection.
fn resolve(outcome: Result<Result<(), CoreError>, tokio::time::error::Elapsed>) -> Resolution {
    match outcome {
        Ok(Ok(())) => Resolution::Ack,
        Ok(Err(e)) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::Validation) => Resolution::Ack,
        Ok(Err(_)) => Resolution::NackRequeue,
        Err(_) => Resolution::NackRequeue,
    }
}

/// Decodes the payload, runs it through a 5-second-bounded evaluation,
/// and acks or nacks-with-requeue per `resolve`.
async fn handle_delivery(delivery: lapin::message::Delivery, service: Arc<EvaluationService>) {
    let outcome = tokio::time::timeout(HANDLE_TIMEOUT, process(&delivery, &service)).await;

    if let Err(e) = &outcome {
        log(LogTag::Worker, "ERROR", &format!("handler timed out after 5s: {e}"));
    } else if let Ok(Err(e)) = &outcome {
        log(LogTag::Worker, "WARN", &format!("handler did not succeed: {e}"));
    }

    let ack_result = match resolve(outcome) {
        Resolution::Ack => delivery.ack(BasicAckOptions::default()).await,
        Resolution::NackRequeue => {
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                })
                .await
        }
    };

    if let Err(e) = ack_result {
        log(LogTag::Worker, "ERROR", &format!("failed to ack/nack delivery: {e}"));
    }
}

async fn process(delivery: &lapin::message::Delivery, service: &EvaluationService) -> CoreResult<()> {
    let message: PresenceMessage =
        serde_json::from_slice(&delivery.data).map_err(|e| CoreError::Validation(e.to_string()))?;

    let opts = EvaluateOpts {
        recompute: true,
        cache: true,
        publish: false,
        ..EvaluateOpts::default()
    };

    service
        .evaluate_region(message.user_id, &message.region_id, opts)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn elapsed() -> tokio::time::error::Elapsed {
        tokio::time::timeout(Duration::from_millis(1), std::future::pending::<()>())
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn success_acks() {
        assert_eq!(resolve(Ok(Ok(()))), Resolution::Ack);
    }

    #[tokio::test]
    async fn not_found_acks_without_retry() {
        let err = CoreError::not_found("region JE");
        assert_eq!(resolve(Ok(Err(err))), Resolution::Ack);
    }

    #[tokio::test]
    async fn validation_acks_without_retry() {
        let err = CoreError::validation("malformed payload");
        assert_eq!(resolve(Ok(Err(err))), Resolution::Ack);
    }

    #[tokio::test]
    async fn internal_error_requeues() {
        let err = CoreError::Internal(anyhow::anyhow!("db unreachable"));
        assert_eq!(resolve(Ok(Err(err))), Resolution::NackRequeue);
    }

    #[tokio::test]
    async fn timeout_requeues() {
        assert_eq!(resolve(Err(elapsed().await)), Resolution::NackRequeue);
    }
}
