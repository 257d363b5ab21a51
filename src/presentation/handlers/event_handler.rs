// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::presentation::errors::{AppError, BadRequest};
use crate::workers::webhook_dispatcher::EVENT_HEADER;
use crate::workers::WebhookDispatcher;
use axum::{extract::Path, http::HeaderMap, http::StatusCode, Extension, Json};
use serde_json::Value;
use tracing::debug;

/// 接收外部事件并异步分发
///
/// 事件类型取自 `X-GitHub-Event` 请求头，立即返回202
pub async fn publish_event<W, D>(
    Extension(dispatcher): Extension<WebhookDispatcher<W, D>>,
    Path(scope_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<StatusCode, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BadRequest("X-GitHub-Event header is required".to_string()))?;

    debug!(scope_id, event_type, "Event accepted for dispatch");
    dispatcher.dispatch(scope_id, event_type, payload);
    Ok(StatusCode::ACCEPTED)
}
