// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::delivery::{DeliveryRecord, NewDeliveryRecord};
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::RepositoryError;
use crate::infrastructure::database::entities::webhook_delivery;
use async_trait::async_trait;
use sea_orm::*;
use std::sync::Arc;

/// 投递日志仓库实现
#[derive(Clone)]
pub struct DeliveryRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl DeliveryRepoImpl {
    /// 创建新的投递日志仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeliveryRepository for DeliveryRepoImpl {
    async fn append(&self, record: &NewDeliveryRecord) -> Result<DeliveryRecord, RepositoryError> {
        let active_model = webhook_delivery::ActiveModel {
            webhook_id: Set(record.webhook_id),
            event_type: Set(record.event_type.clone()),
            payload: Set(record.payload.clone()),
            status_code: Set(record.status_code),
            error_message: Set(record.error_message.clone()),
            duration_ms: Set(record.duration_ms),
            delivered_at: Set(record.delivered_at.into()),
            ..Default::default()
        };

        let inserted = active_model.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<DeliveryRecord>, RepositoryError> {
        let model = webhook_delivery::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn list_by_webhook(
        &self,
        webhook_id: i32,
        limit: u64,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let models = webhook_delivery::Entity::find()
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
            .order_by_desc(webhook_delivery::Column::DeliveredAt)
            .order_by_desc(webhook_delivery::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

impl From<webhook_delivery::Model> for DeliveryRecord {
    fn from(model: webhook_delivery::Model) -> Self {
        Self {
            id: model.id,
            webhook_id: model.webhook_id,
            event_type: model.event_type,
            payload: model.payload,
            status_code: model.status_code,
            error_message: model.error_message,
            duration_ms: model.duration_ms,
            delivered_at: model.delivered_at.into(),
        }
    }
}
