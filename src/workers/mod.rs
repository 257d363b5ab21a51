// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供Webhook事件的后台投递
pub mod webhook_dispatcher;

pub use webhook_dispatcher::{DeliveryFailure, DispatchError, WebhookDispatcher};
