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

use crate::domain::models::delivery::{DeliveryRecord, NewDeliveryRecord, NO_RESPONSE_STATUS};
use crate::domain::models::webhook::{ContentType, Webhook};
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use crate::domain::services::webhook_registry::{RegistryError, WebhookRegistry};
use crate::infrastructure::http::DeliveryClient;
use crate::utils::signature::sign_payload;
use crate::utils::validators::{TargetValidator, ValidationError};
use chrono::Utc;
use futures::{FutureExt, StreamExt};
use metrics::{counter, histogram};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 事件类型请求头
pub const EVENT_HEADER: &str = "x-github-event";
/// 投递标识请求头，取值为Webhook ID
pub const DELIVERY_HEADER: &str = "x-github-delivery";
/// 签名请求头
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// 测试投递使用的事件类型
pub const PING_EVENT: &str = "ping";

const PING_ZEN: &str = "Design for failure.";

/// 测试投递错误
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("webhook {0} not found")]
    NotFound(i32),
    #[error(transparent)]
    Registry(RegistryError),
    /// 投递已完成但记录写入失败
    #[error("failed to record delivery: {0}")]
    Repository(#[from] RepositoryError),
}

/// 单次投递失败原因
#[derive(Error, Debug)]
pub enum DeliveryFailure {
    /// 发送前校验未通过
    #[error("delivery blocked: {0}")]
    Blocked(ValidationError),
    /// 连接、超时或被解析器拒绝
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// 接收方返回非2xx状态码
    #[error("receiver responded with HTTP {0}")]
    Status(u16),
    /// 序列化失败或投递过程中panic
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeliveryFailure {
    /// 记录中的状态码，未收到响应时为 [`NO_RESPONSE_STATUS`]
    pub fn status_code(&self) -> i32 {
        match self {
            DeliveryFailure::Status(status) => i32::from(*status),
            _ => NO_RESPONSE_STATUS,
        }
    }

    /// 指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            DeliveryFailure::Blocked(_) => "blocked",
            DeliveryFailure::Transport(_) => "network_error",
            DeliveryFailure::Status(_) => "http_error",
            DeliveryFailure::Internal(_) => "internal",
        }
    }
}

/// 单次尝试的结果：实际发送（或准备发送）的请求体以及状态
struct AttemptOutcome {
    body: String,
    result: Result<u16, DeliveryFailure>,
}

impl AttemptOutcome {
    fn failed(body: String, failure: DeliveryFailure) -> Self {
        Self {
            body,
            result: Err(failure),
        }
    }
}

/// Webhook投递器
///
/// 把事件投递给作用域内订阅了该事件的全部已启用Webhook。
/// 每个Webhook独立投递，互不影响；每次尝试写入一条投递记录；不重试。
pub struct WebhookDispatcher<W: WebhookRepository, D: DeliveryRepository> {
    /// 订阅注册表
    registry: WebhookRegistry<W>,
    /// 投递日志
    deliveries: Arc<D>,
    /// HTTP客户端
    client: DeliveryClient,
    /// 发送前的地址校验器
    validator: Arc<dyn TargetValidator>,
    /// 并发投递上限
    max_concurrency: usize,
}

impl<W: WebhookRepository, D: DeliveryRepository> Clone for WebhookDispatcher<W, D> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            deliveries: self.deliveries.clone(),
            client: self.client.clone(),
            validator: self.validator.clone(),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl<W, D> WebhookDispatcher<W, D>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    /// 创建新的投递器
    ///
    /// # 参数
    ///
    /// * `registry` - 订阅注册表
    /// * `deliveries` - 投递日志仓库
    /// * `client` - 出站HTTP客户端
    /// * `validator` - 发送前的地址校验器
    /// * `max_concurrency` - 同时进行的投递数量上限
    pub fn new(
        registry: WebhookRegistry<W>,
        deliveries: Arc<D>,
        client: DeliveryClient,
        validator: Arc<dyn TargetValidator>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            deliveries,
            client,
            validator,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// 异步分发事件
    ///
    /// 立即返回；调用方可以忽略返回的句柄
    pub fn dispatch(
        &self,
        scope_id: i64,
        event_type: impl Into<String>,
        payload: Value,
    ) -> JoinHandle<Vec<DeliveryRecord>> {
        let dispatcher = self.clone();
        let event_type = event_type.into();
        tokio::spawn(async move { dispatcher.deliver(scope_id, &event_type, &payload).await })
    }

    /// 分发事件并等待全部投递完成
    ///
    /// # 返回值
    ///
    /// 成功写入的投递记录，顺序不保证
    pub async fn deliver(
        &self,
        scope_id: i64,
        event_type: &str,
        payload: &Value,
    ) -> Vec<DeliveryRecord> {
        let webhooks = match self.registry.find_active_for_event(scope_id, event_type).await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                error!(scope_id, event_type, error = %e, "Failed to load webhooks for event");
                return Vec::new();
            }
        };

        if webhooks.is_empty() {
            debug!(scope_id, event_type, "No webhooks subscribed to event");
            return Vec::new();
        }

        info!(
            scope_id,
            event_type,
            count = webhooks.len(),
            "Dispatching event to webhooks"
        );

        let records = Mutex::new(Vec::with_capacity(webhooks.len()));
        futures::stream::iter(webhooks)
            .for_each_concurrent(self.max_concurrency, |webhook| {
                let records = &records;
                async move {
                    if let Ok(record) = self.deliver_isolated(&webhook, event_type, payload).await {
                        records.lock().push(record);
                    }
                }
            })
            .await;

        records.into_inner()
    }

    /// 向指定Webhook发送ping事件
    ///
    /// 忽略订阅过滤和启用状态，同步返回投递记录
    pub async fn test_delivery(&self, webhook_id: i32) -> Result<DeliveryRecord, DispatchError> {
        let webhook = self.registry.get(webhook_id).await.map_err(|e| match e {
            RegistryError::NotFound(id) => DispatchError::NotFound(id),
            other => DispatchError::Registry(other),
        })?;

        let payload = json!({
            "zen": PING_ZEN,
            "hook_id": webhook.id,
            "hook": webhook,
        });

        Ok(self.deliver_isolated(&webhook, PING_EVENT, &payload).await?)
    }

    /// 在独立的故障边界内完成一次尝试并写入记录
    async fn deliver_isolated(
        &self,
        webhook: &Webhook,
        event_type: &str,
        payload: &Value,
    ) -> Result<DeliveryRecord, RepositoryError> {
        counter!("webhook_delivery_attempts_total").increment(1);
        let start = Instant::now();

        let outcome = match AssertUnwindSafe(self.attempt(webhook, event_type, payload))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!(webhook_id = webhook.id, event_type, "Webhook delivery panicked");
                AttemptOutcome::failed(
                    best_effort_json(payload),
                    DeliveryFailure::Internal(panic_message(&*panic)),
                )
            }
        };

        self.record(webhook, event_type, outcome, start.elapsed()).await
    }

    async fn attempt(&self, webhook: &Webhook, event_type: &str, payload: &Value) -> AttemptOutcome {
        let body = match encode_body(webhook.content_type, payload) {
            Ok(body) => body,
            Err(failure) => return AttemptOutcome::failed(best_effort_json(payload), failure),
        };

        // Configuration may have been valid once; check again before every send
        let target = match self.validator.validate(&webhook.url).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                return AttemptOutcome::failed(body, DeliveryFailure::Blocked(ValidationError::MissingUrl))
            }
            Err(e) => return AttemptOutcome::failed(body, DeliveryFailure::Blocked(e)),
        };

        let headers = match build_headers(webhook, event_type, body.as_bytes()) {
            Ok(headers) => headers,
            Err(failure) => return AttemptOutcome::failed(body, failure),
        };

        debug!(webhook_id = webhook.id, url = %target.url, "Sending webhook request");
        let result = match self.client.post(target.url, headers, body.clone()).await {
            Ok(status) if status.is_success() => Ok(status.as_u16()),
            Ok(status) => Err(DeliveryFailure::Status(status.as_u16())),
            Err(e) => Err(DeliveryFailure::Transport(e)),
        };

        AttemptOutcome { body, result }
    }

    async fn record(
        &self,
        webhook: &Webhook,
        event_type: &str,
        outcome: AttemptOutcome,
        elapsed: Duration,
    ) -> Result<DeliveryRecord, RepositoryError> {
        histogram!("webhook_delivery_duration_seconds").record(elapsed.as_secs_f64());

        let (status_code, error_message) = match &outcome.result {
            Ok(status) => {
                counter!("webhook_delivery_success_total").increment(1);
                info!(
                    webhook_id = webhook.id,
                    event_type,
                    status,
                    "Webhook delivered successfully"
                );
                (i32::from(*status), String::new())
            }
            Err(failure) => {
                counter!("webhook_delivery_failed_total", "reason" => failure.reason()).increment(1);
                warn!(
                    webhook_id = webhook.id,
                    event_type,
                    status = failure.status_code(),
                    error = %failure,
                    "Webhook delivery failed"
                );
                (failure.status_code(), failure.to_string())
            }
        };

        let record = NewDeliveryRecord {
            webhook_id: webhook.id,
            event_type: event_type.to_string(),
            payload: outcome.body,
            status_code,
            error_message,
            duration_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            delivered_at: Utc::now(),
        };

        self.deliveries.append(&record).await.map_err(|e| {
            counter!("webhook_delivery_log_errors_total").increment(1);
            error!(
                webhook_id = webhook.id,
                event_type,
                error = %e,
                "Failed to write delivery record"
            );
            e
        })
    }
}

/// 按内容类型编码请求体
///
/// - `json`：紧凑JSON
/// - `form`：`payload=<urlencoded json>`
pub fn encode_body(content_type: ContentType, payload: &Value) -> Result<String, DeliveryFailure> {
    let json = serde_json::to_string(payload)
        .map_err(|e| DeliveryFailure::Internal(format!("failed to serialize payload: {}", e)))?;

    match content_type {
        ContentType::Json => Ok(json),
        ContentType::Form => serde_urlencoded::to_string([("payload", json.as_str())])
            .map_err(|e| DeliveryFailure::Internal(format!("failed to encode form body: {}", e))),
    }
}

/// 请求体构造失败时记录的负载
fn best_effort_json(payload: &Value) -> String {
    serde_json::to_string(payload).unwrap_or_default()
}

fn build_headers(
    webhook: &Webhook,
    event_type: &str,
    body: &[u8],
) -> Result<HeaderMap, DeliveryFailure> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(EVENT_HEADER),
        header_value(event_type)?,
    );
    headers.insert(
        HeaderName::from_static(DELIVERY_HEADER),
        HeaderValue::from(webhook.id),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(webhook.content_type.mime()),
    );
    if let Some(signature) = sign_payload(body, webhook.secret.as_deref()) {
        headers.insert(
            HeaderName::from_static(SIGNATURE_HEADER),
            header_value(&signature)?,
        );
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, DeliveryFailure> {
    HeaderValue::from_str(value)
        .map_err(|e| DeliveryFailure::Internal(format!("invalid header value {:?}: {}", value, e)))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("delivery panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("delivery panicked: {}", message)
    } else {
        "delivery panicked".to_string()
    }
}
