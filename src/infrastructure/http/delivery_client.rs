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

use super::guarded_resolver::GuardedResolver;
use crate::config::settings::WebhookSettings;
use crate::utils::validators::TargetValidator;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use url::Url;

/// Webhook投递HTTP客户端
///
/// - 单次请求超时取自配置
/// - 不跟随重定向
/// - 不走系统代理
/// - 域名解析经过 [`GuardedResolver`]
#[derive(Clone)]
pub struct DeliveryClient {
    client: Client,
}

impl DeliveryClient {
    /// 创建新的投递客户端
    ///
    /// # 参数
    ///
    /// * `settings` - Webhook配置
    /// * `validator` - 连接时使用的地址校验器
    pub fn new(
        settings: &WebhookSettings,
        validator: Arc<dyn TargetValidator>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .redirect(Policy::none())
            .no_proxy()
            .dns_resolver(Arc::new(GuardedResolver::new(validator)))
            .build()?;

        Ok(Self { client })
    }

    /// 发送POST请求，返回响应状态码
    ///
    /// 响应体被丢弃
    pub async fn post(
        &self,
        url: Url,
        headers: HeaderMap,
        body: String,
    ) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }
}
