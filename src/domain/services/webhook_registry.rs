// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{NewWebhook, Webhook, WebhookUpdate};
use crate::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use crate::utils::validators::{TargetValidator, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// 订阅注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 配置错误，URL不安全或无效
    #[error("invalid webhook configuration: {0}")]
    Configuration(#[from] ValidationError),
    /// Webhook不存在
    #[error("webhook {0} not found")]
    NotFound(i32),
    /// 仓库错误
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Webhook订阅注册表
///
/// 负责Webhook配置的增删改查，并在持久化之前校验投递地址。
pub struct WebhookRegistry<R: WebhookRepository> {
    repo: Arc<R>,
    validator: Arc<dyn TargetValidator>,
}

impl<R: WebhookRepository> Clone for WebhookRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<R: WebhookRepository> WebhookRegistry<R> {
    /// 创建新的注册表
    ///
    /// # 参数
    ///
    /// * `repo` - Webhook仓库
    /// * `validator` - 投递地址校验器
    pub fn new(repo: Arc<R>, validator: Arc<dyn TargetValidator>) -> Self {
        Self { repo, validator }
    }

    /// 注册Webhook
    ///
    /// 先校验URL，校验失败时不会写入任何数据
    pub async fn register(
        &self,
        scope_id: i64,
        webhook: NewWebhook,
    ) -> Result<Webhook, RegistryError> {
        if let Err(e) = self.check_destination(&webhook.url).await {
            warn!(scope_id, url = %webhook.url, error = %e, "Rejected webhook registration");
            return Err(e.into());
        }

        let created = self.repo.create(scope_id, &webhook).await?;
        info!(
            webhook_id = created.id,
            scope_id,
            events = ?created.events,
            "Webhook registered"
        );
        Ok(created)
    }

    /// 根据ID获取Webhook
    pub async fn get(&self, id: i32) -> Result<Webhook, RegistryError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    /// 获取属于指定作用域的Webhook，其他作用域的Webhook视为不存在
    pub async fn get_in_scope(&self, scope_id: i64, id: i32) -> Result<Webhook, RegistryError> {
        let webhook = self.get(id).await?;
        if webhook.scope_id != scope_id {
            return Err(RegistryError::NotFound(id));
        }
        Ok(webhook)
    }

    /// 列出作用域下的全部Webhook
    pub async fn list(&self, scope_id: i64) -> Result<Vec<Webhook>, RegistryError> {
        Ok(self.repo.list_by_scope(scope_id).await?)
    }

    /// 查找订阅了指定事件的已启用Webhook
    ///
    /// 按创建顺序返回。空订阅列表匹配任意事件。
    pub async fn find_active_for_event(
        &self,
        scope_id: i64,
        event_type: &str,
    ) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self
            .repo
            .list_active_by_scope(scope_id)
            .await?
            .into_iter()
            .filter(|webhook| webhook.subscribes_to(event_type))
            .collect())
    }

    /// 更新Webhook
    ///
    /// 持久化前重新校验URL；校验失败时原配置保持不变。
    /// 只写入请求中给出的字段。
    pub async fn update(&self, id: i32, update: WebhookUpdate) -> Result<Webhook, RegistryError> {
        let current = self.get(id).await?;
        let next_url = update.url.as_deref().unwrap_or(&current.url);

        if let Err(e) = self.check_destination(next_url).await {
            warn!(webhook_id = id, url = %next_url, error = %e, "Rejected webhook update");
            return Err(e.into());
        }

        let updated = self.persist(id, &update).await?;
        info!(webhook_id = id, active = updated.active, "Webhook updated");
        Ok(updated)
    }

    /// 启用或停用Webhook
    ///
    /// 停用不需要校验地址；重新启用时按更新处理
    pub async fn set_active(&self, id: i32, active: bool) -> Result<Webhook, RegistryError> {
        let change = WebhookUpdate {
            active: Some(active),
            ..Default::default()
        };
        if active {
            return self.update(id, change).await;
        }

        let updated = self.persist(id, &change).await?;
        info!(webhook_id = id, "Webhook deactivated");
        Ok(updated)
    }

    /// 删除Webhook
    ///
    /// 投递记录保留用于审计
    pub async fn delete(&self, id: i32) -> Result<(), RegistryError> {
        self.repo.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => RegistryError::NotFound(id),
            other => other.into(),
        })?;
        info!(webhook_id = id, "Webhook deleted");
        Ok(())
    }

    async fn persist(&self, id: i32, changes: &WebhookUpdate) -> Result<Webhook, RegistryError> {
        self.repo.update(id, changes).await.map_err(|e| match e {
            RepositoryError::NotFound => RegistryError::NotFound(id),
            other => other.into(),
        })
    }

    async fn check_destination(&self, url: &str) -> Result<(), ValidationError> {
        // A stored hook always needs a destination
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        self.validator.validate(url).await.map(|_| ())
    }
}
