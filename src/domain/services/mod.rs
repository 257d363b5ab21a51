// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 订阅注册表（webhook_registry）：Webhook配置管理与事件匹配
pub mod webhook_registry;
