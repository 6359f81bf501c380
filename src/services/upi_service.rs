// UPI支付链接服务
// 生成各UPI应用的深度链接和通用二维码

use anyhow::{Context, Result};
use rand::Rng;
use rust_decimal::Decimal;

use crate::config::UpiConfig;
use crate::models::{UpiApp, UpiLinkRequest, UpiLinkResponse};
use crate::utils::{generate_payment_qr_code, validate_donation_amount, validate_upi_qr_content};

/// UPI服务
#[derive(Debug, Clone)]
pub struct UpiService {
    upi_id: String,
    merchant_name: String,
    merchant_code: Option<String>,
    currency: String,
    prefix: String,
}

impl UpiService {
    /// 根据配置创建，未配置收款UPI ID时返回 None
    pub fn from_config(config: &UpiConfig, prefix: &str) -> Option<Self> {
        let upi_id = config.upi_id.clone()?;

        Some(Self {
            upi_id,
            merchant_name: config.merchant_name.clone(),
            merchant_code: config.merchant_code.clone(),
            currency: config.currency.clone(),
            prefix: prefix.to_string(),
        })
    }

    /// 生成交易参考号: `{前缀}{毫秒时间戳}{0..999}`
    pub fn new_reference(&self) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            chrono::Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(0..1000)
        )
    }

    /// 构造支付链接
    ///
    /// # Arguments
    /// * `request` - 捐赠人与金额
    /// * `app` - 目标UPI应用
    /// * `reference` - 交易参考号
    pub fn payment_url(&self, request: &UpiLinkRequest, app: UpiApp, reference: &str) -> String {
        let donor = if request.is_anonymous || request.donor_name.trim().is_empty() {
            "Anonymous"
        } else {
            request.donor_name.trim()
        };
        let note = format!("Donation to {} - {}", self.merchant_name, donor);
        let amount = request.amount.normalize().to_string();

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("pa", &self.upi_id)
            .append_pair("pn", &self.merchant_name)
            .append_pair("am", &amount)
            .append_pair("cu", &self.currency)
            .append_pair("tn", &note)
            .append_pair("tr", reference);
        if let Some(code) = &self.merchant_code {
            query.append_pair("mc", code);
        }

        format!("{}?{}", app.scheme(), query.finish())
    }

    /// 生成指定应用的链接以及通用二维码
    pub fn create_links(&self, request: &UpiLinkRequest) -> Result<UpiLinkResponse> {
        validate_amount(&request.amount)?;

        let reference = self.new_reference();
        let payment_url = self.payment_url(request, request.app, &reference);
        let generic_url = self.payment_url(request, UpiApp::Generic, &reference);

        if !validate_upi_qr_content(&generic_url) {
            anyhow::bail!("Generated UPI link is incomplete");
        }

        let qr_code = generate_payment_qr_code(&generic_url).context("Failed to generate UPI QR code")?;

        log::info!("Created UPI link {} for amount {}", reference, request.amount);

        Ok(UpiLinkResponse {
            transaction_ref: reference,
            payment_url,
            qr_code,
        })
    }
}

fn validate_amount(amount: &Decimal) -> Result<()> {
    validate_donation_amount(amount).context("Invalid UPI amount")
}
