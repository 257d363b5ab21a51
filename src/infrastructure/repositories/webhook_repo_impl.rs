// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{NewWebhook, Webhook, WebhookUpdate};
use crate::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use crate::infrastructure::database::entities::webhook;
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::*;
use std::sync::Arc;
use tracing::warn;

/// Webhook仓库实现
#[derive(Clone)]
pub struct WebhookRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl WebhookRepoImpl {
    /// 创建新的Webhook仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WebhookRepository for WebhookRepoImpl {
    async fn create(&self, scope_id: i64, webhook: &NewWebhook) -> Result<Webhook, RepositoryError> {
        let now = Utc::now();
        let model = webhook::ActiveModel {
            scope_id: Set(scope_id),
            url: Set(webhook.url.clone()),
            content_type: Set(webhook.content_type.as_str().to_string()),
            secret: Set(webhook.secret.clone()),
            events: Set(serde_json::json!(webhook.events)),
            active: Set(webhook.active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let inserted = model.insert(self.db.as_ref()).await?;
        inserted.try_into()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Webhook>, RepositoryError> {
        let model = webhook::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    async fn list_by_scope(&self, scope_id: i64) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .filter(webhook::Column::ScopeId.eq(scope_id))
            .order_by_asc(webhook::Column::Id)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_active_by_scope(&self, scope_id: i64) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .filter(webhook::Column::ScopeId.eq(scope_id))
            .filter(webhook::Column::Active.eq(true))
            .order_by_asc(webhook::Column::Id)
            .all(self.db.as_ref())
            .await?;

        // One undecodable row must not hide the rest of the scope
        let webhooks = models
            .into_iter()
            .filter_map(|model| {
                let id = model.id;
                match Webhook::try_from(model) {
                    Ok(webhook) => Some(webhook),
                    Err(e) => {
                        counter!("webhook_corrupt_records_total").increment(1);
                        warn!(webhook_id = id, scope_id, error = %e, "Skipping undecodable webhook");
                        None
                    }
                }
            })
            .collect();

        Ok(webhooks)
    }

    async fn update(&self, id: i32, changes: &WebhookUpdate) -> Result<Webhook, RepositoryError> {
        let txn = self.db.begin().await?;

        let query = webhook::Entity::find_by_id(id);
        let query = if txn.get_database_backend() == DbBackend::Postgres {
            query.lock_exclusive()
        } else {
            query
        };
        let mut active: webhook::ActiveModel = query
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        // Untouched columns stay Unchanged and are not written
        if let Some(url) = &changes.url {
            active.url = Set(url.clone());
        }
        if let Some(content_type) = changes.content_type {
            active.content_type = Set(content_type.as_str().to_string());
        }
        if let Some(secret) = &changes.secret {
            active.secret = Set(Some(secret.clone()).filter(|s| !s.is_empty()));
        }
        if let Some(events) = &changes.events {
            active.events = Set(serde_json::json!(events));
        }
        if let Some(is_active) = changes.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let updated_model = active.update(&txn).await?;
        txn.commit().await?;

        updated_model.try_into()
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let result = webhook::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl TryFrom<webhook::Model> for Webhook {
    type Error = RepositoryError;

    fn try_from(model: webhook::Model) -> Result<Self, Self::Error> {
        let events: Vec<String> = serde_json::from_value(model.events)
            .map_err(|e| RepositoryError::Corrupt(format!("webhook {} events: {}", model.id, e)))?;
        let content_type = model
            .content_type
            .parse()
            .map_err(|e| RepositoryError::Corrupt(format!("webhook {}: {}", model.id, e)))?;

        Ok(Self {
            id: model.id,
            scope_id: model.scope_id,
            url: model.url,
            content_type,
            secret: model.secret.filter(|s| !s.is_empty()),
            events,
            active: model.active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}
