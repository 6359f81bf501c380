// API路由配置
// 定义所有HTTP接口的路由规则

use actix_web::{web, Scope};
use crate::handlers::*;

/// API v1路由配置
pub fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        // 支付请求路由
        .service(payment_routes())
        // 捐赠查询路由
        .service(donation_routes())
        // UPI路由
        .service(upi_routes())
        .route("/version", web::get().to(version_info))
}

/// 支付请求路由
fn payment_routes() -> Scope {
    web::scope("/payments")
        .route("", web::post().to(create_payment))
        .route("/checkout", web::post().to(checkout))
}

/// 捐赠查询路由
fn donation_routes() -> Scope {
    web::scope("/donations")
        .route("/total", web::get().to(get_donation_total))
        .route("/{transaction_id}", web::get().to(get_donation))
}

/// UPI路由
fn upi_routes() -> Scope {
    web::scope("/upi")
        .route("/links", web::post().to(create_upi_link))
        .route("/apps", web::get().to(list_upi_apps))
}

/// 网关回调路由 (成功/失败地址，支持表单提交和查询参数)
pub fn callback_routes() -> Scope {
    web::scope("/payment")
        .route("/success", web::post().to(payment_callback_form))
        .route("/success", web::get().to(payment_callback_query))
        .route("/failure", web::post().to(payment_callback_form))
        .route("/failure", web::get().to(payment_callback_query))
}

/// 公共路由
pub fn public_routes() -> Scope {
    web::scope("")
        .route("/health", web::get().to(health_check))
}
