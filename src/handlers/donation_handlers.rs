// 捐赠查询API处理器

use actix_web::{web, HttpResponse, Result as ActixResult};

use crate::models::{ApiResponse, DonationStatusView, DonationTotalResponse};
use crate::state::AppState;
use crate::utils::is_well_formed_transaction_id;

/// 已完成捐赠总额
///
/// GET /api/v1/donations/total
pub async fn get_donation_total(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match data.donations.total_completed_amount().await {
        Ok(total_amount) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            DonationTotalResponse {
                total_amount,
                currency: data.config.upi.currency.clone(),
            },
        ))),
        Err(e) => {
            log::error!("Failed to get donation total: {:#}", e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Internal server error")))
        }
    }
}

/// 按交易号查询捐赠状态
///
/// GET /api/v1/donations/{transaction_id}
///
/// 交易号会出现在回调地址中，响应不返回捐赠人信息
pub async fn get_donation(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let transaction_id = path.into_inner();

    if !is_well_formed_transaction_id(&transaction_id) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(400, "Invalid transaction id")));
    }

    match data.donations.find_by_transaction_id(&transaction_id).await {
        Ok(Some(record)) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(DonationStatusView::from(record)))),
        Ok(None) => Ok(HttpResponse::NotFound()
            .json(ApiResponse::<()>::error(404, "Donation not found"))),
        Err(e) => {
            log::error!("Failed to get donation {}: {:#}", transaction_id, e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Internal server error")))
        }
    }
}
