// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Webhook实体
///
/// 表示一个Webhook端点配置，用于接收所属作用域（例如仓库）内的事件通知。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    /// Webhook唯一标识符，按创建顺序递增
    pub id: i32,
    /// 所属作用域ID，例如仓库ID
    pub scope_id: i64,
    /// Webhook回调URL，接收通知的目标地址
    pub url: String,
    /// 请求体编码方式
    pub content_type: ContentType,
    /// 签名密钥，未配置时不发送签名头
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    /// 订阅的事件类型，为空表示订阅全部事件
    pub events: Vec<String>,
    /// 是否启用
    pub active: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// 判断Webhook是否订阅了指定事件
    ///
    /// 区分大小写的精确匹配；空订阅列表匹配任意事件
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == event_type)
    }
}

/// 新建Webhook所需的配置
#[derive(Debug, Clone)]
pub struct NewWebhook {
    pub url: String,
    pub content_type: ContentType,
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub active: bool,
}

impl NewWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: ContentType::Json,
            secret: None,
            events: Vec::new(),
            active: true,
        }
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = normalize_secret(Some(secret.into()));
        self
    }

    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Webhook部分更新
///
/// `None` 字段保持原值。`secret` 为空字符串时清除密钥。
#[derive(Debug, Clone, Default)]
pub struct WebhookUpdate {
    pub url: Option<String>,
    pub content_type: Option<ContentType>,
    pub secret: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// 请求体编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`，负载放在 `payload` 字段中
    Form,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Form => "form",
        }
    }

    /// HTTP `Content-Type` 头的值
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ContentType::Json),
            "form" => Ok(ContentType::Form),
            other => Err(format!("unsupported content_type: {}", other)),
        }
    }
}

fn normalize_secret(secret: Option<String>) -> Option<String> {
    secret.filter(|s| !s.is_empty())
}
