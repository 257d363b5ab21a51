// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_repository::RepositoryError;
use crate::domain::models::delivery::{DeliveryRecord, NewDeliveryRecord};
use async_trait::async_trait;

/// 投递日志仓库特质
///
/// 只追加：记录写入后不提供修改或删除接口
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// 追加一条投递记录
    async fn append(&self, record: &NewDeliveryRecord) -> Result<DeliveryRecord, RepositoryError>;
    /// 根据ID查找投递记录
    async fn find_by_id(&self, id: i32) -> Result<Option<DeliveryRecord>, RepositoryError>;
    /// 按投递时间倒序列出某个Webhook的投递记录
    async fn list_by_webhook(
        &self,
        webhook_id: i32,
        limit: u64,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError>;
}
