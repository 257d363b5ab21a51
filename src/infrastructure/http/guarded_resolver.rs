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

use crate::utils::validators::TargetValidator;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::sync::Arc;
use tracing::warn;
use url::Host;

/// 带地址检查的DNS解析器
///
/// 建立连接时的解析结果即为校验过的结果，只返回通过检查的地址。
/// 任一地址不安全时解析失败，请求不会发出。
#[derive(Clone)]
pub struct GuardedResolver {
    validator: Arc<dyn TargetValidator>,
}

impl GuardedResolver {
    pub fn new(validator: Arc<dyn TargetValidator>) -> Self {
        Self { validator }
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let validator = self.validator.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            // reqwest replaces the port with the one from the URL
            let addrs = validator
                .check_host(Host::Domain(&host), 0)
                .await
                .map_err(|e| {
                    warn!(host = %host, error = %e, "Refusing connection to webhook host");
                    Box::new(e) as Box<dyn std::error::Error + Send + Sync>
                })?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}
