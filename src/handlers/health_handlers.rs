// 健康检查和版本信息API处理器

use actix_web::{http::StatusCode, web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::models::ApiResponse;
use crate::state::AppState;

/// 系统健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 存储类型
    pub storage: String,
    /// 存储连接状态
    pub database: String,
    /// 网关环境
    pub gateway: String,
    /// 当前时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 基础健康检查
///
/// GET /health
///
/// 响应: HealthResponse
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: data.donations.backend().to_string(),
        database: "connected".to_string(),
        gateway: data.payu.endpoint().to_string(),
        timestamp: chrono::Utc::now(),
    };

    if let Err(e) = data.donations.ping().await {
        log::error!("Storage health check failed: {:#}", e);
        health.database = "disconnected".to_string();
        health.status = "unhealthy".to_string();
    }

    let status_code = if health.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok(HttpResponse::build(status_code).json(health))
}

/// 系统版本信息
///
/// GET /api/v1/version
pub async fn version_info() -> ActixResult<HttpResponse> {
    let version_info = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });

    Ok(HttpResponse::Ok().json(ApiResponse::success(version_info)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notification_service::RecordingNotifier;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health_check() {
        let state = web::Data::new(AppState::new_for_test(Arc::new(RecordingNotifier::default())));
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["status"], "healthy");
        assert_eq!(resp["storage"], "memory");
        assert_eq!(resp["gateway"], "https://test.payu.in/_payment");
    }

    #[actix_web::test]
    async fn test_version_info() {
        let app = test::init_service(App::new().route("/version", web::get().to(version_info))).await;

        let req = test::TestRequest::get().uri("/version").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["data"]["name"], "donapay");
    }
}
