// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{ContentType, NewWebhook, WebhookUpdate};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// 创建Webhook请求
///
/// `{"config": {"url": ..., "content_type": ..., "secret": ...}, "events": [...], "active": true}`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHookRequestDto {
    #[validate(nested)]
    pub config: HookConfigDto,
    #[serde(default)]
    #[validate(custom(function = "validate_event_names"))]
    pub events: Vec<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HookConfigDto {
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub url: String,
    pub content_type: Option<ContentType>,
    pub secret: Option<String>,
}

impl CreateHookRequestDto {
    pub fn into_new_webhook(self) -> NewWebhook {
        let mut webhook = NewWebhook::new(self.config.url)
            .content_type(self.config.content_type.unwrap_or_default())
            .events(self.events)
            .active(self.active.unwrap_or(true));
        if let Some(secret) = self.config.secret {
            webhook = webhook.secret(secret);
        }
        webhook
    }
}

/// 更新Webhook请求，所有字段可选
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateHookRequestDto {
    #[validate(nested)]
    pub config: Option<UpdateHookConfigDto>,
    #[validate(custom(function = "validate_event_names"))]
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateHookConfigDto {
    #[validate(length(max = 2048))]
    pub url: Option<String>,
    pub content_type: Option<ContentType>,
    pub secret: Option<String>,
}

impl UpdateHookRequestDto {
    /// 仅包含 `active: false` 的请求等同于停用
    pub fn is_deactivation_only(&self) -> bool {
        self.config.is_none() && self.events.is_none() && self.active == Some(false)
    }

    pub fn into_update(self) -> WebhookUpdate {
        let config = self.config.unwrap_or_default();
        WebhookUpdate {
            url: config.url,
            content_type: config.content_type,
            secret: config.secret,
            events: self.events,
            active: self.active,
        }
    }
}

/// 投递记录查询参数
#[derive(Debug, Deserialize, Validate)]
pub struct DeliveryQueryDto {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

fn validate_event_names(events: &Vec<String>) -> Result<(), ValidationError> {
    if events.iter().any(|event| event.trim().is_empty()) {
        return Err(ValidationError::new("empty_event_name"));
    }
    Ok(())
}
