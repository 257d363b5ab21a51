// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 出站HTTP模块
///
/// Webhook投递使用的HTTP客户端，连接前对解析结果做SSRF检查
pub mod delivery_client;
pub mod guarded_resolver;

pub use delivery_client::DeliveryClient;
pub use guarded_resolver::GuardedResolver;
