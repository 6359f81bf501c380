// UPI支付链接API处理器

use actix_web::{web, HttpResponse, Result as ActixResult};

use crate::models::{ApiResponse, UpiApp, UpiAppInfo, UpiLinkRequest};
use crate::state::AppState;

/// 生成UPI支付链接和二维码
///
/// POST /api/v1/upi/links
///
/// 请求体: UpiLinkRequest
/// 响应: UpiLinkResponse
pub async fn create_upi_link(
    data: web::Data<AppState>,
    request: web::Json<UpiLinkRequest>,
) -> ActixResult<HttpResponse> {
    let Some(upi) = &data.upi else {
        return Ok(HttpResponse::ServiceUnavailable()
            .json(ApiResponse::<()>::error(503, "UPI payments are not configured")));
    };

    match upi.create_links(&request) {
        Ok(links) => Ok(HttpResponse::Created().json(ApiResponse::success(links))),
        Err(e) => {
            log::warn!("Failed to create UPI link: {:#}", e);
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, format!("{:#}", e))))
        }
    }
}

/// 支持的UPI应用列表
///
/// GET /api/v1/upi/apps
pub async fn list_upi_apps() -> ActixResult<HttpResponse> {
    let apps: Vec<UpiAppInfo> = UpiApp::ALL
        .iter()
        .map(|app| UpiAppInfo {
            id: *app,
            name: app.display_name(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(apps)))
}
