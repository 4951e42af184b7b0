//! Message broker wiring for the async invalidation pipeline (§4.5, §5).
//!
//! Grounded on the original's RabbitMQ topology in
//! `internal/worker/evaluation.go`: a topic exchange carrying presence
//! mutation events, consumed by a durable worker queue that recomputes and
//! caches the affected evaluation. `evaluation.created` is the
//! complementary event the service side can publish once an evaluation
//! has actually been produced, so other subsystems can react without
//! polling the cache table.

pub mod worker;

use crate::domain::{RegionId, UserId};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, ExchangeKind};
use serde::{Deserialize, Serialize};

/// Topic exchange presence mutations are published to.
pub const PRESENCE_EXCHANGE: &str = "presence.events";
/// Routing key for a presence create (range expanded server-side).
pub const PRESENCE_CREATE_KEY: &str = "presence.create";
/// Routing key for a presence delete.
pub const PRESENCE_DELETE_KEY: &str = "presence.delete";
/// Durable queue the worker consumes presence events from.
pub const PRESENCE_WORKER_QUEUE: &str = "presence.worker";

/// Topic exchange evaluation-produced events are published to.
pub const EVALUATION_EXCHANGE: &str = "evaluation.events";
/// Routing key published once `EvaluationService::evaluate_region` caches
/// a fresh result.
pub const EVALUATION_CREATED_KEY: &str = "evaluation.created";

/// Wire payload for a presence mutation message — the only information
/// the worker needs to recompute one user's region evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    pub user_id: UserId,
    pub region_id: RegionId,
}

/// Declares both topic exchanges used by the pipeline. Idempotent —
/// `durable` exchange declarations are safe to repeat on every process
/// start.
pub async fn declare_topology(channel: &Channel) -> CoreResult<()> {
    for exchange in [PRESENCE_EXCHANGE, EVALUATION_EXCHANGE] {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;
    }
    Ok(())
}

/// Publishes a presence mutation event. Called from the presence HTTP
/// handlers after the synchronous cache delete in
/// `CacheInvalidator::on_presence_mutation` — the cache is already
/// consistent by the time this fires, so a lost or delayed message only
/// delays the async recomputation, never correctness (§4.5).
pub async fn publish_presence_mutation(
    channel: &Channel,
    routing_key: &str,
    user_id: UserId,
    region_id: &RegionId,
) -> CoreResult<()> {
    let payload = PresenceMessage {
        user_id,
        region_id: region_id.clone(),
    };
    let body = serde_json::to_vec(&payload).map_err(|e| CoreError::Internal(e.into()))?;

    channel
        .basic_publish(
            PRESENCE_EXCHANGE,
            routing_key,
            BasicPublishOptions::default(),
            &body,
            BasicProperties::default().with_delivery_mode(2),
        )
        .await
        .map_err(|e| CoreError::Internal(e.into()))?
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

    Ok(())
}

/// Abstraction over "something that can announce a freshly produced
/// evaluation", injected into `EvaluationService` so unit tests don't need
/// a running broker.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_evaluation_created(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()>;
}

/// Real publisher, backed by a lapin channel on `evaluation.events`.
pub struct LapinEventPublisher {
    channel: Channel,
}

impl LapinEventPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl EventPublisher for LapinEventPublisher {
    async fn publish_evaluation_created(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()> {
        let payload = PresenceMessage {
            user_id,
            region_id: region_id.clone(),
        };
        let body = serde_json::to_vec(&payload).map_err(|e| CoreError::Internal(e.into()))?;

        self.channel
            .basic_publish(
                EVALUATION_EXCHANGE,
                EVALUATION_CREATED_KEY,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}

/// No-op publisher for evaluation runs that don't need the side effect —
/// the worker's own recomputation passes `publish: false` since it was
/// itself triggered by a presence event, not the other way around.
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish_evaluation_created(&self, _user_id: UserId, _region_id: &RegionId) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_message_round_trips_camel_case_json() {
        let message = PresenceMessage {
            user_id: UserId(42),
            region_id: RegionId::parse("JE").unwrap(),
        };
        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: PresenceMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.user_id, message.user_id);
        assert_eq!(decoded.region_id, message.region_id);
    }
}
