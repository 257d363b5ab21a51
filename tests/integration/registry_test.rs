// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_guarded_context, create_test_context};
use hookrelay::domain::models::webhook::{ContentType, NewWebhook, WebhookUpdate};
use hookrelay::domain::repositories::webhook_repository::WebhookRepository;
use hookrelay::domain::services::webhook_registry::RegistryError;
use hookrelay::utils::validators::{StaticResolver, ValidationError};
use std::net::IpAddr;
use std::sync::Arc;

#[tokio::test]
async fn test_register_and_get() {
    let ctx = create_test_context().await;

    let created = ctx
        .registry
        .register(
            1,
            NewWebhook::new("http://127.0.0.1:9999/hook")
                .content_type(ContentType::Form)
                .secret("s3cr3t")
                .events(["issues", "push"]),
        )
        .await
        .unwrap();

    assert_eq!(created.scope_id, 1);
    assert!(created.active);
    assert_eq!(created.events, vec!["issues", "push"]);

    let fetched = ctx.registry.get(created.id).await.unwrap();
    assert_eq!(fetched.url, "http://127.0.0.1:9999/hook");
    assert_eq!(fetched.content_type, ContentType::Form);
    assert_eq!(fetched.secret.as_deref(), Some("s3cr3t"));
}

#[tokio::test]
async fn test_register_rejects_private_address_without_persisting() {
    let ctx = create_test_context().await;

    let result = ctx
        .registry
        .register(1, NewWebhook::new("http://10.0.0.5/hook"))
        .await;

    assert!(matches!(
        result,
        Err(RegistryError::Configuration(ValidationError::BlockedAddress(_)))
    ));
    assert!(ctx.webhooks.list_by_scope(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_rejects_missing_url_and_bad_scheme() {
    let ctx = create_test_context().await;

    let missing = ctx.registry.register(1, NewWebhook::new("")).await;
    assert!(matches!(
        missing,
        Err(RegistryError::Configuration(ValidationError::MissingUrl))
    ));

    let scheme = ctx
        .registry
        .register(1, NewWebhook::new("ftp://example.com/hook"))
        .await;
    assert!(matches!(
        scheme,
        Err(RegistryError::Configuration(ValidationError::UnsupportedScheme(_)))
    ));

    assert!(ctx.registry.list(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_active_for_event_filters_and_orders() {
    let ctx = create_test_context().await;

    let wildcard = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9001/a"))
        .await
        .unwrap();
    let issues_only = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9002/b").events(["issues"]))
        .await
        .unwrap();
    let inactive = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9003/c").active(false))
        .await
        .unwrap();
    let other_scope = ctx
        .registry
        .register(2, NewWebhook::new("http://127.0.0.1:9004/d"))
        .await
        .unwrap();

    let ids = |hooks: Vec<hookrelay::domain::models::webhook::Webhook>| {
        hooks.into_iter().map(|h| h.id).collect::<Vec<_>>()
    };

    let pull_request = ctx
        .registry
        .find_active_for_event(1, "pull_request")
        .await
        .unwrap();
    assert_eq!(ids(pull_request), vec![wildcard.id]);

    let issues = ctx.registry.find_active_for_event(1, "issues").await.unwrap();
    assert_eq!(ids(issues), vec![wildcard.id, issues_only.id]);

    // Matching is case-sensitive
    let upper = ctx.registry.find_active_for_event(1, "Issues").await.unwrap();
    assert_eq!(ids(upper), vec![wildcard.id]);

    assert!(!ids(ctx.registry.find_active_for_event(1, "push").await.unwrap())
        .contains(&inactive.id));
    assert_eq!(
        ids(ctx.registry.find_active_for_event(2, "push").await.unwrap()),
        vec![other_scope.id]
    );
}

#[tokio::test]
async fn test_update_rejects_unsafe_url_and_keeps_previous() {
    let ctx = create_test_context().await;
    let created = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9001/hook").events(["push"]))
        .await
        .unwrap();

    let result = ctx
        .registry
        .update(
            created.id,
            WebhookUpdate {
                url: Some("http://169.254.169.254/latest/meta-data".to_string()),
                events: Some(vec!["issues".to_string()]),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(RegistryError::Configuration(_))));
    let stored = ctx.registry.get(created.id).await.unwrap();
    assert_eq!(stored.url, "http://127.0.0.1:9001/hook");
    assert_eq!(stored.events, vec!["push"]);
}

#[tokio::test]
async fn test_update_applies_partial_changes() {
    let ctx = create_test_context().await;
    let created = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9001/hook").secret("old"))
        .await
        .unwrap();

    let updated = ctx
        .registry
        .update(
            created.id,
            WebhookUpdate {
                content_type: Some(ContentType::Form),
                events: Some(vec!["issues".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.url, created.url);
    assert_eq!(updated.content_type, ContentType::Form);
    assert_eq!(updated.events, vec!["issues"]);
    assert_eq!(updated.secret.as_deref(), Some("old"));

    // An empty secret clears it
    let cleared = ctx
        .registry
        .update(
            created.id,
            WebhookUpdate {
                secret: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.secret.is_none());
}

#[tokio::test]
async fn test_set_active_toggles() {
    let ctx = create_test_context().await;
    let created = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9001/hook"))
        .await
        .unwrap();

    let inactive = ctx.registry.set_active(created.id, false).await.unwrap();
    assert!(!inactive.active);
    assert!(ctx
        .registry
        .find_active_for_event(1, "push")
        .await
        .unwrap()
        .is_empty());

    let active = ctx.registry.set_active(created.id, true).await.unwrap();
    assert!(active.active);
}

#[tokio::test]
async fn test_concurrent_deactivate_and_event_update_both_persist() {
    let ctx = create_test_context().await;

    for round in 0..30 {
        let created = ctx
            .registry
            .register(1, NewWebhook::new(format!("http://127.0.0.1:9001/hook/{}", round)))
            .await
            .unwrap();

        let events = WebhookUpdate {
            events: Some(vec!["issues".to_string()]),
            ..Default::default()
        };
        let (deactivated, updated) = tokio::join!(
            ctx.registry.set_active(created.id, false),
            ctx.registry.update(created.id, events),
        );
        deactivated.unwrap();
        updated.unwrap();

        let stored = ctx.registry.get(created.id).await.unwrap();
        assert!(!stored.active, "round {} lost the deactivation", round);
        assert_eq!(stored.events, vec!["issues".to_string()], "round {}", round);
    }
}

#[tokio::test]
async fn test_repository_update_writes_only_given_fields() {
    let ctx = create_test_context().await;
    let created = ctx
        .registry
        .register(
            1,
            NewWebhook::new("http://127.0.0.1:9001/hook")
                .secret("s3cr3t")
                .events(["push"])
                .content_type(ContentType::Form),
        )
        .await
        .unwrap();

    let change = WebhookUpdate {
        active: Some(false),
        ..Default::default()
    };
    let updated = ctx.webhooks.update(created.id, &change).await.unwrap();

    assert!(!updated.active);
    assert_eq!(updated.url, created.url);
    assert_eq!(updated.events, created.events);
    assert_eq!(updated.secret, created.secret);
    assert_eq!(updated.content_type, ContentType::Form);
}

#[tokio::test]
async fn test_reactivation_revalidates_destination() {
    let dns = Arc::new(StaticResolver::new());
    dns.insert("hooks.example.com", vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
    let ctx = create_guarded_context(dns.clone()).await;

    let created = ctx
        .registry
        .register(1, NewWebhook::new("https://hooks.example.com/hook"))
        .await
        .unwrap();
    ctx.registry.set_active(created.id, false).await.unwrap();

    dns.insert("hooks.example.com", vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);

    let result = ctx.registry.set_active(created.id, true).await;
    assert!(matches!(
        result,
        Err(RegistryError::Configuration(ValidationError::BlockedAddress(_)))
    ));
    assert!(!ctx.registry.get(created.id).await.unwrap().active);
}

#[tokio::test]
async fn test_delete_and_scope_isolation() {
    let ctx = create_test_context().await;
    let created = ctx
        .registry
        .register(1, NewWebhook::new("http://127.0.0.1:9001/hook"))
        .await
        .unwrap();

    assert!(matches!(
        ctx.registry.get_in_scope(2, created.id).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(ctx.registry.get_in_scope(1, created.id).await.is_ok());

    ctx.registry.delete(created.id).await.unwrap();

    assert!(matches!(
        ctx.registry.get(created.id).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        ctx.registry.delete(created.id).await,
        Err(RegistryError::NotFound(_))
    ));
}
