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

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use url::{Host, Url};

/// 验证错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 未提供URL
    #[error("webhook URL is required")]
    MissingUrl,
    /// URL无效
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),
    /// 协议不受支持
    #[error("webhook URL must use http or https, got {0}")]
    UnsupportedScheme(String),
    /// 缺少主机名
    #[error("webhook URL has no host")]
    MissingHost,
    /// DNS解析失败
    #[error("could not resolve webhook host {host}: {reason}")]
    ResolutionFailed { host: String, reason: String },
    /// 检测到SSRF攻击
    #[error("webhook URL cannot target private address {0}")]
    BlockedAddress(IpAddr),
}

/// 已通过校验的投递目标
#[derive(Debug, Clone)]
pub struct ValidatedTarget {
    pub url: Url,
    /// 全部解析地址，每一个都已通过检查
    pub addrs: Vec<SocketAddr>,
}

/// 主机名解析器
///
/// 把名称解析从校验逻辑中剥离出来，便于在测试中替换
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// 基于系统DNS的解析器
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }
}

/// 固定映射的解析器
///
/// 未登记的主机名一律解析失败。映射可以在运行中修改，
/// 用来模拟注册之后DNS记录被改写的情况。
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: RwLock<HashMap<String, Vec<IpAddr>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置（或替换）主机名对应的地址集合
    pub fn insert(&self, host: impl Into<String>, addrs: Vec<IpAddr>) {
        self.entries
            .write()
            .insert(host.into().to_ascii_lowercase(), addrs);
    }

    pub fn remove(&self, host: &str) {
        self.entries.write().remove(&host.to_ascii_lowercase());
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        self.entries
            .read()
            .get(&host.to_ascii_lowercase())
            .map(|ips| ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
    }
}

/// 投递目标校验特质
///
/// 注册/更新Webhook时以及每次发送前都会调用。
#[async_trait]
pub trait TargetValidator: Send + Sync {
    /// 把主机解析为允许连接的地址集合
    ///
    /// 任何一个地址不安全，整个主机都被拒绝。
    async fn check_host(
        &self,
        host: Host<&str>,
        port: u16,
    ) -> Result<Vec<SocketAddr>, ValidationError>;

    /// 验证URL
    ///
    /// # 返回值
    ///
    /// * `Ok(None)` - 空字符串，表示未配置投递地址
    /// * `Ok(Some(target))` - URL安全
    /// * `Err(ValidationError)` - URL无效或存在安全风险
    async fn validate(&self, url: &str) -> Result<Option<ValidatedTarget>, ValidationError> {
        if url.is_empty() {
            return Ok(None);
        }

        let parsed = parse_target_url(url)?;
        let host = parsed.host().ok_or(ValidationError::MissingHost)?;
        let port = parsed.port_or_known_default().unwrap_or(80);
        let addrs = self.check_host(host, port).await?;

        Ok(Some(ValidatedTarget { url: parsed, addrs }))
    }
}

/// SSRF防护校验器
#[derive(Clone)]
pub struct UrlValidator {
    resolver: Arc<dyn HostResolver>,
}

impl UrlValidator {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self { resolver }
    }

    /// 使用系统DNS的校验器
    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::system()
    }
}

#[async_trait]
impl TargetValidator for UrlValidator {
    async fn check_host(
        &self,
        host: Host<&str>,
        port: u16,
    ) -> Result<Vec<SocketAddr>, ValidationError> {
        let addrs = match host {
            Host::Ipv4(ip) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Host::Ipv6(ip) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            Host::Domain(name) => {
                // Fail closed: a host we cannot resolve is never trusted
                let resolved = self.resolver.lookup(name, port).await.map_err(|e| {
                    ValidationError::ResolutionFailed {
                        host: name.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if resolved.is_empty() {
                    return Err(ValidationError::ResolutionFailed {
                        host: name.to_string(),
                        reason: "no addresses returned".to_string(),
                    });
                }
                resolved
            }
        };

        if let Some(blocked) = addrs.iter().find(|addr| is_blocked_ip(addr.ip())) {
            return Err(ValidationError::BlockedAddress(blocked.ip()));
        }

        Ok(addrs)
    }
}

/// 解析URL并检查协议
pub fn parse_target_url(url: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    Ok(parsed)
}

/// 检查IP地址是否属于禁止投递的网段
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_blocked_ipv4(ipv4),
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_blocked_ipv4(mapped);
            }
            if let Some(embedded) = nat64_embedded_ipv4(ipv6) {
                return is_blocked_ipv4(embedded);
            }
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique Local Address (fc00::/7)
                || (first & 0xfe00) == 0xfc00
                // Link-local (fe80::/10)
                || (first & 0xffc0) == 0xfe80
                // Link-local multicast (ff02::/16)
                || first == 0xff02
        }
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    // 127.0.0.0/8, 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16, 169.254.0.0/16
    let [a, b, c, _] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        // Link-local multicast (224.0.0.0/24)
        || (a == 224 && b == 0 && c == 0)
}

/// 从NAT64众所周知前缀 `64:ff9b::/96` 中取出内嵌的IPv4地址
fn nat64_embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = ip.segments();
    if segments[..6] != [0x64, 0xff9b, 0, 0, 0, 0] {
        return None;
    }
    let [.., hi, lo] = segments;
    Some(Ipv4Addr::from(((hi as u32) << 16) | lo as u32))
}
