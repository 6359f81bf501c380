// 支付API处理器
// 处理签名支付请求的创建以及网关成功/失败回调

use actix_web::{web, Either, HttpResponse, Result as ActixResult};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{
    ApiResponse, CallbackVerdict, DonationRecord, DonationStatus, DonorDetails, FormField,
    PaymentOutcome, PaymentResponse, SaveResult, TransactionState, TransitionError,
};
use crate::state::AppState;
use crate::utils::{is_well_formed_transaction_id, InputValidator};

/// 签名后的支付请求
#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    /// 交易号
    pub transaction_id: String,
    /// 表单提交地址
    pub action: String,
    /// 提交方式
    pub method: &'static str,
    /// 按顺序排列的表单字段 (含签名)
    pub fields: Vec<FormField>,
    /// 交易状态
    pub state: TransactionState,
}

/// 回调处理结果
#[derive(Debug, Serialize)]
pub struct CallbackResult {
    /// 交易号 (验证失败时为回调中声称的值)
    pub transaction_id: String,
    /// 交易状态
    pub state: TransactionState,
    /// 签名是否有效
    pub verified: bool,
    /// 支付结果 (仅验证通过时存在)
    pub outcome: Option<PaymentOutcome>,
    /// 面向捐赠人的提示信息
    pub message: String,
    /// 是否为重复回调
    pub duplicate: bool,
}

const VERIFICATION_FAILED_MESSAGE: &str = "Payment verification failed. Please contact support.";

/// 校验捐赠表单
///
/// 签名串以 `|` 分隔，任何参与签名的字段都不允许包含该字符
fn validate_donor(donor: &DonorDetails) -> anyhow::Result<()> {
    let mut validator = InputValidator::new();

    validator.validate_required("donor_name", &donor.donor_name);
    validator.validate_email_field("donor_email", &donor.donor_email);
    validator.validate_phone_field("donor_phone", &donor.donor_phone);
    validator.validate_amount_field("amount", &donor.amount);

    let signed_fields = [
        ("donor_name", Some(donor.donor_name.as_str())),
        ("donor_email", Some(donor.donor_email.as_str())),
        ("beneficiary", donor.beneficiary()),
        ("purpose", donor.purpose()),
    ];
    for (field, value) in signed_fields {
        if let Some(value) = value {
            if value.contains('|') {
                validator.add_error(field, "Must not contain '|'");
            }
            validator.validate_length(field, value, 0, 100);
        }
    }

    validator.into_result()
}

/// 创建签名支付请求
///
/// POST /api/v1/payments
///
/// 请求体: DonorDetails
/// 响应: CreatePaymentResponse
pub async fn create_payment(
    data: web::Data<AppState>,
    request: web::Json<DonorDetails>,
) -> ActixResult<HttpResponse> {
    let donor = request.into_inner();

    if let Err(e) = validate_donor(&donor) {
        log::warn!("Rejected donation request: {}", e);
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, e.to_string())));
    }

    let payment = data.payu.create_payment(&donor);
    let response = CreatePaymentResponse {
        transaction_id: payment.txnid.clone(),
        action: data.payu.endpoint().to_string(),
        method: "POST",
        fields: payment.form_fields(),
        state: TransactionState::Initiated,
    };

    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

/// 生成自动提交到网关的HTML表单
///
/// POST /api/v1/payments/checkout
///
/// 请求体: DonorDetails (JSON或表单)
/// 响应: text/html
pub async fn checkout(
    data: web::Data<AppState>,
    request: Either<web::Json<DonorDetails>, web::Form<DonorDetails>>,
) -> ActixResult<HttpResponse> {
    let donor = match request {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    if let Err(e) = validate_donor(&donor) {
        log::warn!("Rejected checkout request: {}", e);
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, e.to_string())));
    }

    let payment = data.payu.create_payment(&donor);
    let html = render_checkout_form(data.payu.endpoint(), &payment.form_fields());

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

/// 网关回调 (POST，表单编码)
///
/// POST /payment/success, POST /payment/failure
pub async fn payment_callback_form(
    data: web::Data<AppState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let params: HashMap<String, String> = url::form_urlencoded::parse(&body)
        .into_owned()
        .collect();

    handle_callback(&data, &params).await
}

/// 网关回调 (GET，查询参数)
///
/// GET /payment/success, GET /payment/failure
pub async fn payment_callback_query(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> ActixResult<HttpResponse> {
    handle_callback(&data, &query).await
}

/// 验证、分类、记录并通知
async fn handle_callback(
    data: &web::Data<AppState>,
    params: &HashMap<String, String>,
) -> ActixResult<HttpResponse> {
    let response = PaymentResponse::from_params(params);

    let verdict = if is_well_formed_transaction_id(&response.txnid) {
        data.payu.process_callback(&response)
    } else {
        log::warn!("Callback with malformed transaction id rejected");
        CallbackVerdict::VerificationFailed
    };

    // 每个回调都来自已跳转网关的交易
    let state = match TransactionState::AwaitingCallback.on_callback(&verdict) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Unexpected state transition for {}: {}", response.txnid, e);
            TransactionState::VerificationFailed
        }
    };

    let outcome = match verdict {
        CallbackVerdict::Verified(outcome) => outcome,
        CallbackVerdict::VerificationFailed => {
            let result = CallbackResult {
                transaction_id: response.txnid,
                state,
                verified: false,
                outcome: None,
                message: VERIFICATION_FAILED_MESSAGE.to_string(),
                duplicate: false,
            };
            return Ok(HttpResponse::BadRequest().json(ApiResponse::with_message(
                400,
                VERIFICATION_FAILED_MESSAGE,
                result,
            )));
        }
    };

    // 存储失败不影响验证结论
    let (state, outcome, duplicate) = match record_outcome(data, &response, state).await {
        Ok(SaveResult::Duplicate) => {
            let (state, outcome) = stored_outcome(data, &response.txnid, state, outcome).await;
            (state, outcome, true)
        }
        Ok(_) => (state, outcome, false),
        Err(e) => {
            log::error!("Failed to record donation {}: {:#}", response.txnid, e);
            (state, outcome, false)
        }
    };

    log::info!(
        "Callback for {} verified: state={:?}, duplicate={}",
        response.txnid,
        state,
        duplicate
    );

    let result = CallbackResult {
        transaction_id: response.txnid,
        state,
        verified: true,
        message: outcome.message(),
        outcome: Some(outcome),
        duplicate,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
}

/// 重复回调以已存储的状态为准，终态不会被后续回调改变
async fn stored_outcome(
    data: &web::Data<AppState>,
    txnid: &str,
    state: TransactionState,
    outcome: PaymentOutcome,
) -> (TransactionState, PaymentOutcome) {
    let stored = match data.donations.find_by_transaction_id(txnid).await {
        Ok(Some(record)) => record,
        Ok(None) => return (state, outcome),
        Err(e) => {
            log::error!("Failed to load donation {}: {:#}", txnid, e);
            return (state, outcome);
        }
    };

    let verdict = CallbackVerdict::Verified(outcome.clone());
    match stored.status.state().on_callback(&verdict) {
        Err(TransitionError::Terminal(terminal)) => {
            if terminal != state {
                log::warn!(
                    "Ignoring {:?} callback for {}: already {:?}",
                    state,
                    txnid,
                    terminal
                );
            }
            (terminal, stored.outcome())
        }
        Ok(_) | Err(TransitionError::Invalid { .. }) => (state, outcome),
    }
}

/// 持久化已验证结果，首次完成时异步发送通知
async fn record_outcome(
    data: &web::Data<AppState>,
    response: &PaymentResponse,
    state: TransactionState,
) -> anyhow::Result<SaveResult> {
    let Some(status) = DonationStatus::from_state(state) else {
        anyhow::bail!("State {:?} has no stored status", state);
    };

    let record = DonationRecord::from_verified(response, status)?;
    let save_result = data.donations.save_outcome(record.clone()).await?;

    if save_result.is_change() && record.is_completed() {
        let notifier = data.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_donation(&record).await {
                log::error!("Failed to notify donation {}: {:#}", record.transaction_id, e);
            }
        });
    }

    Ok(save_result)
}

/// 渲染自动提交表单
fn render_checkout_form(action: &str, fields: &[FormField]) -> String {
    let inputs: String = fields
        .iter()
        .map(|field| {
            format!(
                "      <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(&field.name),
                escape_html(&field.value)
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n  <head><meta charset=\"utf-8\"><title>Redirecting to payment</title></head>\n  \
         <body onload=\"document.forms[0].submit()\">\n    <form method=\"POST\" action=\"{}\">\n{}      \
         <noscript><button type=\"submit\">Continue to payment</button></noscript>\n    </form>\n  </body>\n</html>\n",
        escape_html(action),
        inputs
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
