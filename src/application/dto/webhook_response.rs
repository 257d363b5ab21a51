// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{ContentType, Webhook};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook响应，不包含签名密钥
#[derive(Debug, Serialize, Deserialize)]
pub struct HookResponseDto {
    pub id: i32,
    pub scope_id: i64,
    pub active: bool,
    pub events: Vec<String>,
    pub config: HookConfigResponseDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HookConfigResponseDto {
    pub url: String,
    pub content_type: ContentType,
    /// 是否配置了签名密钥
    pub secret_configured: bool,
}

impl From<Webhook> for HookResponseDto {
    fn from(webhook: Webhook) -> Self {
        Self {
            id: webhook.id,
            scope_id: webhook.scope_id,
            active: webhook.active,
            events: webhook.events,
            config: HookConfigResponseDto {
                url: webhook.url,
                content_type: webhook.content_type,
                secret_configured: webhook.secret.is_some(),
            },
            created_at: webhook.created_at,
            updated_at: webhook.updated_at,
        }
    }
}
