// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{NewWebhook, Webhook, WebhookUpdate};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储的数据无法解析
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Webhook仓库特质
///
/// 定义Webhook配置的数据访问接口
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// 创建Webhook
    async fn create(&self, scope_id: i64, webhook: &NewWebhook) -> Result<Webhook, RepositoryError>;
    /// 根据ID查找Webhook
    async fn find_by_id(&self, id: i32) -> Result<Option<Webhook>, RepositoryError>;
    /// 按创建顺序列出作用域下的全部Webhook
    async fn list_by_scope(&self, scope_id: i64) -> Result<Vec<Webhook>, RepositoryError>;
    /// 按创建顺序列出作用域下已启用的Webhook
    ///
    /// 无法解析的记录被跳过，不影响其余Webhook
    async fn list_active_by_scope(&self, scope_id: i64) -> Result<Vec<Webhook>, RepositoryError>;
    /// 在同一事务内读取并只写入 `changes` 中给出的字段
    ///
    /// 未给出的字段保持数据库中的当前值，并发的其他修改不会被覆盖
    async fn update(&self, id: i32, changes: &WebhookUpdate) -> Result<Webhook, RepositoryError>;
    /// 删除Webhook
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}
