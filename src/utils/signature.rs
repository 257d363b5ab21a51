// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 签名头的值前缀
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// 为负载生成签名
///
/// 对实际发送的字节计算 HMAC-SHA256，因此必须在序列化之后调用。
/// 接收方校验签名时应使用常量时间比较。
///
/// # 参数
///
/// * `payload` - 将要发送的请求体
/// * `secret` - Webhook密钥
///
/// # 返回值
///
/// 形如 `sha256=<hex>` 的签名；密钥为空或未配置时返回 `None`，此时不发送签名头
pub fn sign_payload(payload: &[u8], secret: Option<&str>) -> Option<String> {
    let secret = secret.filter(|s| !s.is_empty())?;
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}
