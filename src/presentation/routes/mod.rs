// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::webhook_registry::WebhookRegistry;
use crate::presentation::handlers::{event_handler, webhook_handler};
use crate::workers::WebhookDispatcher;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `registry` - 订阅注册表
/// * `dispatcher` - 事件投递器
/// * `deliveries` - 投递日志仓库
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes<W, D>(
    registry: WebhookRegistry<W>,
    dispatcher: WebhookDispatcher<W, D>,
    deliveries: Arc<D>,
) -> Router
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let hook_routes = Router::new()
        .route(
            "/scopes/{scope_id}/hooks",
            post(webhook_handler::create_hook::<W>).get(webhook_handler::list_hooks::<W>),
        )
        .route(
            "/scopes/{scope_id}/hooks/{id}",
            get(webhook_handler::get_hook::<W>)
                .patch(webhook_handler::update_hook::<W>)
                .delete(webhook_handler::delete_hook::<W>),
        )
        .route(
            "/scopes/{scope_id}/hooks/{id}/tests",
            post(webhook_handler::test_hook::<W, D>),
        )
        .route(
            "/scopes/{scope_id}/hooks/{id}/deliveries",
            get(webhook_handler::list_deliveries::<W, D>),
        )
        .route(
            "/scopes/{scope_id}/events",
            post(event_handler::publish_event::<W, D>),
        )
        .layer(Extension(registry))
        .layer(Extension(dispatcher))
        .layer(Extension(deliveries));

    Router::new()
        .merge(public_routes)
        .merge(hook_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
