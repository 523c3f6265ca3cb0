//! Inbound webhook route.
//!
//! The body is taken as raw bytes: the HMAC signature covers the exact bytes
//! on the wire, so the payload must not be parsed (or even touched as JSON)
//! until the signature checks out.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::{PgSyncStore, TenantRepository};
use crate::error::AppError;
use crate::state::AppState;
use crate::sync::webhook::{HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER};
use crate::sync::{EventOutcome, Reconciler, WebhookTopic};

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/shopify", post(receive_shopify))
}

/// POST /webhooks/shopify - apply one pushed event.
///
/// Missing headers reject with 400 before any work; an invalid signature
/// rejects with 401 and zero writes. Shopify redelivers on any non-2xx
/// response, which is safe because event application is idempotent.
#[instrument(skip(state, headers, body))]
async fn receive_shopify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let shop_domain = require_header(&headers, SHOP_DOMAIN_HEADER)?;
    let signature = require_header(&headers, HMAC_HEADER)?;
    let topic = WebhookTopic::from(require_header(&headers, TOPIC_HEADER)?);

    let store = PgSyncStore::new(state.pool());
    let tenants = TenantRepository::new(state.pool());
    let engine = Reconciler::new(
        &store,
        &tenants,
        state.remote(),
        &state.config().webhook_secret,
    );

    let outcome = engine
        .apply_event(&topic, shop_domain, &body, signature)
        .await?;

    Ok(Json(acknowledge(&outcome)))
}

fn require_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing required header: {name}")))
}

fn acknowledge(outcome: &EventOutcome) -> Value {
    match outcome {
        EventOutcome::OrderCreated { order, customer } => json!({
            "status": "applied",
            "order": order,
            "customer": customer,
        }),
        EventOutcome::OrderAlreadySeen => json!({ "status": "already_seen" }),
        EventOutcome::CustomerUpserted { customer } => json!({
            "status": "applied",
            "customer": customer,
        }),
        EventOutcome::Ignored { topic } => json!({
            "status": "ignored",
            "topic": topic,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use tidesync_core::{CustomerId, OrderId};

    use super::*;

    #[test]
    fn test_require_header_present() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SHOP_DOMAIN_HEADER,
            HeaderValue::from_static("acme.myshopify.com"),
        );

        assert_eq!(
            require_header(&headers, SHOP_DOMAIN_HEADER).unwrap(),
            "acme.myshopify.com"
        );
    }

    #[test]
    fn test_require_header_missing_is_bad_request() {
        let err = require_header(&HeaderMap::new(), TOPIC_HEADER).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_acknowledge_shapes() {
        let ack = acknowledge(&EventOutcome::OrderCreated {
            order: OrderId::new(5),
            customer: Some(CustomerId::new(3)),
        });
        assert_eq!(ack["status"], "applied");
        assert_eq!(ack["order"], 5);

        let ack = acknowledge(&EventOutcome::Ignored {
            topic: "refunds/create".to_owned(),
        });
        assert_eq!(ack["status"], "ignored");
        assert_eq!(ack["topic"], "refunds/create");
    }
}
