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

use crate::application::dto::webhook_request::{
    CreateHookRequestDto, DeliveryQueryDto, UpdateHookRequestDto,
};
use crate::application::dto::webhook_response::HookResponseDto;
use crate::domain::models::delivery::DeliveryRecord;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::webhook_registry::WebhookRegistry;
use crate::presentation::errors::AppError;
use crate::workers::WebhookDispatcher;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_DELIVERY_LIMIT: u64 = 30;

pub async fn create_hook<W: WebhookRepository + 'static>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Path(scope_id): Path<i64>,
    Json(request): Json<CreateHookRequestDto>,
) -> Result<(StatusCode, Json<HookResponseDto>), AppError> {
    request.validate()?;

    let webhook = registry
        .register(scope_id, request.into_new_webhook())
        .await?;
    Ok((StatusCode::CREATED, Json(webhook.into())))
}

pub async fn list_hooks<W: WebhookRepository + 'static>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Path(scope_id): Path<i64>,
) -> Result<Json<Vec<HookResponseDto>>, AppError> {
    let webhooks = registry.list(scope_id).await?;
    Ok(Json(webhooks.into_iter().map(Into::into).collect()))
}

pub async fn get_hook<W: WebhookRepository + 'static>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Path((scope_id, id)): Path<(i64, i32)>,
) -> Result<Json<HookResponseDto>, AppError> {
    let webhook = registry.get_in_scope(scope_id, id).await?;
    Ok(Json(webhook.into()))
}

/// 部分更新Webhook
///
/// 仅停用时不重新校验地址，其余情况都会重新校验
pub async fn update_hook<W: WebhookRepository + 'static>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Path((scope_id, id)): Path<(i64, i32)>,
    Json(request): Json<UpdateHookRequestDto>,
) -> Result<Json<HookResponseDto>, AppError> {
    request.validate()?;
    registry.get_in_scope(scope_id, id).await?;

    let webhook = if request.is_deactivation_only() {
        registry.set_active(id, false).await?
    } else {
        registry.update(id, request.into_update()).await?
    };
    Ok(Json(webhook.into()))
}

pub async fn delete_hook<W: WebhookRepository + 'static>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Path((scope_id, id)): Path<(i64, i32)>,
) -> Result<StatusCode, AppError> {
    registry.get_in_scope(scope_id, id).await?;
    registry.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 发送ping测试投递
///
/// 成功返回204，否则返回502和记录的错误
pub async fn test_hook<W, D>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Extension(dispatcher): Extension<WebhookDispatcher<W, D>>,
    Path((scope_id, id)): Path<(i64, i32)>,
) -> Result<Response, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    registry.get_in_scope(scope_id, id).await?;

    let record = dispatcher.test_delivery(id).await?;
    if record.is_success() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body = Json(json!({
        "error": record.error_message,
        "status_code": record.status_code,
        "delivery_id": record.id,
    }));
    Ok((StatusCode::BAD_GATEWAY, body).into_response())
}

/// 投递记录，按时间倒序
pub async fn list_deliveries<W, D>(
    Extension(registry): Extension<WebhookRegistry<W>>,
    Extension(deliveries): Extension<Arc<D>>,
    Path((scope_id, id)): Path<(i64, i32)>,
    Query(query): Query<DeliveryQueryDto>,
) -> Result<Json<Vec<DeliveryRecord>>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    query.validate()?;
    registry.get_in_scope(scope_id, id).await?;

    let records = deliveries
        .list_by_webhook(id, query.limit.unwrap_or(DEFAULT_DELIVERY_LIMIT))
        .await?;
    Ok(Json(records))
}
