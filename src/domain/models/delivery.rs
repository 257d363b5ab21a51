// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 未收到HTTP响应时记录的状态码
pub const NO_RESPONSE_STATUS: i32 = 0;

/// 投递记录
///
/// 每次投递尝试对应一条记录，写入后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: i32,
    pub webhook_id: i32,
    pub event_type: String,
    /// 实际发送的请求体
    pub payload: String,
    /// HTTP响应状态码，未收到响应时为 [`NO_RESPONSE_STATUS`]
    pub status_code: i32,
    /// 错误信息，成功时为空
    pub error_message: String,
    /// 本次尝试耗时（毫秒）
    pub duration_ms: i64,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn is_success(&self) -> bool {
        self.error_message.is_empty() && (200..300).contains(&self.status_code)
    }
}

/// 待写入的投递记录
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    pub webhook_id: i32,
    pub event_type: String,
    pub payload: String,
    pub status_code: i32,
    pub error_message: String,
    pub duration_ms: i64,
    pub delivered_at: DateTime<Utc>,
}
