// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 网络钩子（webhook）：订阅配置，描述事件应投递到哪里
/// - 投递记录（delivery）：每一次投递尝试的审计日志
pub mod delivery;
pub mod webhook;
