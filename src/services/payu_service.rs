// 支付网关签名服务
// 负责构造带签名的支付请求、验证网关回调签名并对支付结果进行分类

use thiserror::Error;

use crate::config::PayuConfig;
use crate::models::{
    CallbackVerdict, DonorDetails, ExtraFields, HashFields, PaymentOutcome, PaymentRequest,
    PaymentResponse,
};
use crate::utils::{constant_time_eq, generate_transaction_id, mask_secret, sha512_hex};

/// 保留的空字段分隔符 (udf6..udf10)
const RESERVED_SLOTS: &str = "||||||";

/// 网关配置错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayuError {
    #[error("PayU merchant key is not configured")]
    MissingMerchantKey,
    #[error("PayU salt is not configured")]
    MissingSalt,
}

/// 计算请求签名
///
/// 顺序: key|txnid|amount|productinfo|firstname|email|udf1..udf5||||||salt
///
/// # Arguments
/// * `fields` - 参与签名的字段
/// * `salt` - 共享盐值
///
/// # Returns
/// * 128位小写十六进制SHA-512摘要
pub fn request_hash(fields: &HashFields<'_>, salt: &str) -> String {
    let mut parts = vec![
        fields.key,
        fields.txnid,
        fields.amount,
        fields.productinfo,
        fields.firstname,
        fields.email,
    ];
    parts.extend(fields.udf.as_array());

    let hash_string = format!("{}{}{}", parts.join("|"), RESERVED_SLOTS, salt);
    sha512_hex(&hash_string)
}

/// 计算回调签名
///
/// 顺序与请求相反: salt|status||||||udf5..udf1|email|firstname|productinfo|amount|txnid|key
///
/// # Arguments
/// * `fields` - 回调中回传的字段
/// * `status` - 网关状态
/// * `salt` - 共享盐值
pub fn response_hash(fields: &HashFields<'_>, status: &str, salt: &str) -> String {
    let mut parts: Vec<&str> = fields.udf.as_array().into_iter().rev().collect();
    parts.extend([
        fields.email,
        fields.firstname,
        fields.productinfo,
        fields.amount,
        fields.txnid,
        fields.key,
    ]);

    let hash_string = format!("{}|{}{}{}", salt, status, RESERVED_SLOTS, parts.join("|"));
    sha512_hex(&hash_string)
}

/// 根据网关状态对已验证回调进行分类 (大小写不敏感)
pub fn classify(response: &PaymentResponse) -> PaymentOutcome {
    match response.status.trim().to_ascii_lowercase().as_str() {
        "success" => PaymentOutcome::Succeeded {
            gateway_payment_id: response.gateway_payment_id(),
        },
        "failure" | "failed" => PaymentOutcome::Failed {
            reason: Some(response.error_message.trim().to_string())
                .filter(|reason| !reason.is_empty() && !reason.eq_ignore_ascii_case("no error")),
        },
        "pending" => PaymentOutcome::Pending,
        _ => PaymentOutcome::Unknown {
            status: response.status.clone(),
        },
    }
}

/// 支付网关客户端
///
/// 在程序入口处根据配置显式创建，并通过应用状态共享
#[derive(Debug, Clone)]
pub struct PayuClient {
    config: PayuConfig,
}

impl PayuClient {
    /// 创建客户端，缺少商户Key或盐值时立即失败
    pub fn new(config: PayuConfig) -> Result<Self, PayuError> {
        if config.merchant_key.trim().is_empty() {
            return Err(PayuError::MissingMerchantKey);
        }
        if config.salt.trim().is_empty() {
            return Err(PayuError::MissingSalt);
        }

        log::info!(
            "PayU client ready: key={}, mode={:?}",
            mask_secret(&config.merchant_key),
            config.mode
        );

        Ok(Self { config })
    }

    /// 网关表单提交地址
    pub fn endpoint(&self) -> &'static str {
        self.config.mode.endpoint()
    }

    /// 生成新的交易号
    pub fn new_transaction_id(&self) -> String {
        generate_transaction_id(&self.config.txn_prefix)
    }

    /// 构造带签名的支付请求
    ///
    /// # Arguments
    /// * `donor` - 捐赠人表单数据 (已在上游校验)
    ///
    /// # Returns
    /// * 可直接提交到网关的支付请求
    pub fn create_payment(&self, donor: &DonorDetails) -> PaymentRequest {
        self.create_payment_with_txnid(donor, self.new_transaction_id())
    }

    /// 使用指定交易号构造支付请求
    pub fn create_payment_with_txnid(&self, donor: &DonorDetails, txnid: String) -> PaymentRequest {
        let productinfo = self.product_info(donor);
        let udf = ExtraFields::from_values([
            donor.beneficiary().unwrap_or_default(),
            donor.purpose().unwrap_or_default(),
            donor.donation_type.as_str(),
            self.config.organisation_tag.as_str(),
            "",
        ]);

        let mut request = PaymentRequest {
            key: self.config.merchant_key.clone(),
            txnid,
            amount: donor.amount_string(),
            productinfo,
            firstname: donor.donor_name.clone(),
            email: donor.donor_email.clone(),
            phone: donor.donor_phone.clone(),
            surl: self.config.success_url.clone(),
            furl: self.config.failure_url.clone(),
            hash: String::new(),
            service_provider: self.config.service_provider.clone(),
            udf,
        };
        request.hash = request_hash(&request.hash_fields(), &self.config.salt);

        log::info!(
            "Created payment request {} for amount {}",
            request.txnid,
            request.amount
        );

        request
    }

    /// 验证回调签名
    ///
    /// 缺失字段按空字符串处理，任何不匹配均返回 false
    pub fn verify_response(&self, response: &PaymentResponse) -> bool {
        if response.hash.is_empty() {
            return false;
        }

        let expected = response_hash(&response.hash_fields(), &response.status, &self.config.salt);
        constant_time_eq(&expected, &response.hash.to_ascii_lowercase())
    }

    /// 处理回调: 先验证签名，验证通过后才进行分类
    pub fn process_callback(&self, response: &PaymentResponse) -> CallbackVerdict {
        if response.key != self.config.merchant_key {
            log::warn!("Callback for {} carries a foreign merchant key", response.txnid);
            return CallbackVerdict::VerificationFailed;
        }

        if !self.verify_response(response) {
            log::warn!("Callback hash mismatch for transaction {}", response.txnid);
            return CallbackVerdict::VerificationFailed;
        }

        CallbackVerdict::Verified(classify(response))
    }

    /// 商品描述
    fn product_info(&self, donor: &DonorDetails) -> String {
        match donor.beneficiary() {
            Some(beneficiary) => format!(
                "Donation for {} - {}",
                beneficiary,
                donor.purpose().unwrap_or("Support")
            ),
            None => format!(
                "Donation to {} - {}",
                self.config.organisation_name,
                donor.purpose().unwrap_or("General Fund")
            ),
        }
    }
}
