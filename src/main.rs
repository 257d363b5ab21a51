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

use hookrelay::config::settings::Settings;
use hookrelay::domain::services::webhook_registry::WebhookRegistry;
use hookrelay::infrastructure::database::connection;
use hookrelay::infrastructure::http::DeliveryClient;
use hookrelay::infrastructure::repositories::delivery_repo_impl::DeliveryRepoImpl;
use hookrelay::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;
use hookrelay::presentation::routes;
use hookrelay::utils::validators::{TargetValidator, UrlValidator};
use hookrelay::workers::WebhookDispatcher;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use hookrelay::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting hookrelay...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    if settings.metrics.enabled {
        hookrelay::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr);
    }

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    connection::run_migrations(db.as_ref()).await?;

    // 4. Initialize components
    let validator: Arc<dyn TargetValidator> = Arc::new(UrlValidator::system());
    let webhook_repository = Arc::new(WebhookRepoImpl::new(db.clone()));
    let delivery_repository = Arc::new(DeliveryRepoImpl::new(db.clone()));

    let registry = WebhookRegistry::new(webhook_repository, validator.clone());
    let client = DeliveryClient::new(&settings.webhook, validator.clone())?;
    let dispatcher = WebhookDispatcher::new(
        registry.clone(),
        delivery_repository.clone(),
        client,
        validator,
        settings.webhook.max_concurrency,
    );
    info!(
        timeout_secs = settings.webhook.timeout_secs,
        max_concurrency = settings.webhook.max_concurrency,
        "Webhook dispatcher initialized"
    );

    // 5. Start HTTP server
    let app = routes::routes(registry, dispatcher, delivery_repository);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
