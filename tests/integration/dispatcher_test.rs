// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    create_guarded_context, create_test_context, create_test_context_with, PanickingValidator,
};
use hookrelay::config::settings::WebhookSettings;
use hookrelay::domain::models::delivery::NO_RESPONSE_STATUS;
use hookrelay::domain::models::webhook::{ContentType, NewWebhook};
use hookrelay::domain::repositories::delivery_repository::DeliveryRepository;
use hookrelay::utils::validators::StaticResolver;
use hookrelay::workers::DispatchError;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_signed_json_delivery() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    let body = r#"{"action":"opened"}"#;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("X-GitHub-Event", "issues"))
        .and(header("Content-Type", "application/json"))
        .and(header(
            "X-Hub-Signature-256",
            "sha256=893b8b176c39b217756497563a1b9ba1507d371642b1edf4ee9f876b8fd74ecc",
        ))
        .and(body_string(body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let webhook = ctx
        .registry
        .register(
            1,
            NewWebhook::new(format!("{}/hook", receiver.uri()))
                .secret("s3cr3t")
                .events(["issues"]),
        )
        .await
        .unwrap();

    let records = ctx
        .dispatcher
        .deliver(1, "issues", &json!({"action": "opened"}))
        .await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.webhook_id, webhook.id);
    assert_eq!(record.event_type, "issues");
    assert_eq!(record.status_code, 200);
    assert_eq!(record.payload, body);
    assert!(record.error_message.is_empty());
    assert!(record.is_success());

    let stored = ctx.deliveries.list_by_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(stored, records);
    let by_id = ctx.deliveries.find_by_id(record.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(record));
}

#[tokio::test]
async fn test_delivery_headers_identify_hook() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    let webhook = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(header("X-GitHub-Delivery", webhook.id.to_string().as_str()))
        .and(header(
            "User-Agent",
            format!("hookrelay-Hookshot/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&receiver)
        .await;

    let records = ctx.dispatcher.deliver(1, "push", &json!({})).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, 204);
}

#[tokio::test]
async fn test_unsigned_delivery_has_no_signature_header() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(header_exists("X-Hub-Signature-256"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    ctx.registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "issues", &json!({"n": 1})).await;
    assert_eq!(records.len(), 1);
    assert!(records[0].is_success());
}

#[tokio::test]
async fn test_form_delivery_signs_encoded_body() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    let body = "payload=%7B%22action%22%3A%22opened%22%7D";
    Mock::given(method("POST"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(header(
            "X-Hub-Signature-256",
            "sha256=2ef4ecbf5f2c1ee370f8aba4dbea18376932e107b2e861021817ad1c47543c76",
        ))
        .and(body_string(body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    ctx.registry
        .register(
            1,
            NewWebhook::new(format!("{}/hook", receiver.uri()))
                .content_type(ContentType::Form)
                .secret("s3cr3t"),
        )
        .await
        .unwrap();

    let records = ctx
        .dispatcher
        .deliver(1, "issues", &json!({"action": "opened"}))
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload, body);
    assert!(records[0].is_success());
}

#[tokio::test]
async fn test_error_status_is_recorded_without_retry() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&receiver)
        .await;

    let webhook = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "push", &json!({"ref": "main"})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, 500);
    assert!(!records[0].error_message.is_empty());
    assert!(!records[0].is_success());

    let stored = ctx.deliveries.list_by_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_inactive_and_unsubscribed_hooks_are_skipped() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;

    let inactive = ctx
        .registry
        .register(
            1,
            NewWebhook::new(format!("{}/inactive", receiver.uri())).active(false),
        )
        .await
        .unwrap();
    let issues_only = ctx
        .registry
        .register(
            1,
            NewWebhook::new(format!("{}/issues", receiver.uri())).events(["issues"]),
        )
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "pull_request", &json!({})).await;

    assert!(records.is_empty());
    for id in [inactive.id, issues_only.id] {
        assert!(ctx.deliveries.list_by_webhook(id, 10).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_wildcard_and_filtered_hooks() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(path("/wildcard"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;
    Mock::given(path("/issues"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;

    let wildcard = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/wildcard", receiver.uri())))
        .await
        .unwrap();
    ctx.registry
        .register(
            1,
            NewWebhook::new(format!("{}/issues", receiver.uri())).events(["issues"]),
        )
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "pull_request", &json!({})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].webhook_id, wildcard.id);
}

#[tokio::test]
async fn test_one_failure_does_not_affect_siblings() {
    let ctx = create_test_context().await;
    let healthy = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&healthy)
        .await;

    // Nothing listens on port 9 locally
    let unreachable = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9/hook"))
        .await
        .unwrap();
    for suffix in ["a", "b"] {
        ctx.registry
            .register(1, NewWebhook::new(format!("{}/{}", healthy.uri(), suffix)))
            .await
            .unwrap();
    }

    let records = ctx.dispatcher.deliver(1, "push", &json!({})).await;

    assert_eq!(records.len(), 3);
    let failed: Vec<_> = records.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].webhook_id, unreachable.id);
    assert_eq!(failed[0].status_code, NO_RESPONSE_STATUS);
    assert!(!failed[0].error_message.is_empty());
}

#[tokio::test]
async fn test_panic_in_one_attempt_is_isolated() {
    let validator = Arc::new(PanickingValidator::new(9));
    let ctx = create_test_context_with(validator.clone(), WebhookSettings::default()).await;
    let healthy = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&healthy)
        .await;

    let exploding = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9/hook"))
        .await
        .unwrap();
    let fine = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/hook", healthy.uri())))
        .await
        .unwrap();
    validator.arm();

    let records = ctx
        .dispatcher
        .deliver(1, "push", &json!({"ref": "main"}))
        .await;

    assert_eq!(records.len(), 2);
    let panicked = records.iter().find(|r| r.webhook_id == exploding.id).unwrap();
    assert_eq!(panicked.status_code, NO_RESPONSE_STATUS);
    assert!(panicked.error_message.contains("panicked"));
    // No body was built, the record keeps the JSON rendering of the event
    assert_eq!(panicked.payload, r#"{"ref":"main"}"#);
    let delivered = records.iter().find(|r| r.webhook_id == fine.id).unwrap();
    assert!(delivered.is_success());
}

#[tokio::test]
async fn test_timeout_is_a_transport_failure() {
    let settings = WebhookSettings {
        timeout_secs: 1,
        ..Default::default()
    };
    let ctx = create_test_context_with(
        Arc::new(super::helpers::LoopbackAllowingValidator),
        settings,
    )
    .await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&receiver)
        .await;

    ctx.registry
        .register(1, NewWebhook::new(format!("{}/slow", receiver.uri())))
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "push", &json!({})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, NO_RESPONSE_STATUS);
    assert!(records[0].error_message.starts_with("transport error"));
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(path("/hook"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "http://127.0.0.1:9/internal"),
        )
        .expect(1)
        .mount(&receiver)
        .await;

    ctx.registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();

    let records = ctx.dispatcher.deliver(1, "push", &json!({})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, 302);
    assert!(!records[0].is_success());
}

#[tokio::test]
async fn test_rebinding_to_private_address_is_blocked() {
    let dns = Arc::new(StaticResolver::new());
    dns.insert("hooks.example.com", vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
    let ctx = create_guarded_context(dns.clone()).await;

    let webhook = ctx
        .registry
        .register(1, NewWebhook::new("http://hooks.example.com/hook"))
        .await
        .unwrap();

    dns.insert("hooks.example.com", vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);

    let records = ctx.dispatcher.deliver(1, "push", &json!({})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].webhook_id, webhook.id);
    assert_eq!(records[0].status_code, NO_RESPONSE_STATUS);
    assert!(records[0].error_message.contains("127.0.0.1"));
}

#[tokio::test]
async fn test_dispatch_runs_in_background() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let webhook = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();

    let handle = ctx.dispatcher.dispatch(1, "push", json!({"ref": "main"}));
    let records = handle.await.unwrap();

    assert_eq!(records.len(), 1);
    let stored = ctx.deliveries.list_by_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload, r#"{"ref":"main"}"#);
}

#[tokio::test]
async fn test_delete_keeps_delivery_records() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&receiver)
        .await;

    let webhook = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/hook", receiver.uri())))
        .await
        .unwrap();
    ctx.dispatcher.deliver(1, "push", &json!({})).await;
    ctx.dispatcher.deliver(1, "issues", &json!({})).await;

    ctx.registry.delete(webhook.id).await.unwrap();

    let stored = ctx.deliveries.list_by_webhook(webhook.id, 10).await.unwrap();
    assert_eq!(stored.len(), 2);
    // Newest first
    assert_eq!(stored[0].event_type, "issues");
    assert_eq!(stored[1].event_type, "push");

    assert!(ctx.dispatcher.deliver(1, "push", &json!({})).await.is_empty());
}

#[tokio::test]
async fn test_ping_ignores_filter_and_active_flag() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-GitHub-Event", "ping"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let webhook = ctx
        .registry
        .register(
            1,
            NewWebhook::new(format!("{}/hook", receiver.uri()))
                .events(["issues"])
                .active(false),
        )
        .await
        .unwrap();

    let record = ctx.dispatcher.test_delivery(webhook.id).await.unwrap();

    assert_eq!(record.event_type, "ping");
    assert!(record.is_success());
    let payload: Value = serde_json::from_str(&record.payload).unwrap();
    assert_eq!(payload["zen"], "Design for failure.");
    assert_eq!(payload["hook_id"], webhook.id);
    assert!(payload["hook"].get("secret").is_none());
}

#[tokio::test]
async fn test_ping_for_missing_hook() {
    let ctx = create_test_context().await;

    let result = ctx.dispatcher.test_delivery(404).await;

    assert!(matches!(result, Err(DispatchError::NotFound(404))));
}

#[tokio::test]
async fn test_undecodable_hook_does_not_block_siblings() {
    let ctx = create_test_context().await;
    let receiver = MockServer::start().await;

    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;
    Mock::given(path("/healthy"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let broken = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/broken", receiver.uri())))
        .await
        .unwrap();
    let healthy = ctx
        .registry
        .register(1, NewWebhook::new(format!("{}/healthy", receiver.uri())))
        .await
        .unwrap();

    ctx.db
        .execute_unprepared(&format!(
            "UPDATE webhooks SET content_type = 'xml' WHERE id = {}",
            broken.id
        ))
        .await
        .unwrap();

    let active = ctx.registry.find_active_for_event(1, "push").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, healthy.id);

    let records = ctx.dispatcher.deliver(1, "push", &json!({"ref": "main"})).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].webhook_id, healthy.id);
    assert!(records[0].is_success());
    assert!(ctx.deliveries.list_by_webhook(broken.id, 10).await.unwrap().is_empty());
}
