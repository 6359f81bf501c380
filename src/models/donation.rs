// 捐赠数据模型
// 定义捐赠表单、捐赠记录及其持久化状态

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::payment::{PaymentOutcome, PaymentResponse, TransactionState};

// 与 donations 表的列宽一致
const MAX_PHONE_LENGTH: usize = 32;
const MAX_GATEWAY_PAYMENT_ID_LENGTH: usize = 64;
const MAX_PAYMENT_MODE_LENGTH: usize = 32;

/// 捐赠周期
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DonationType {
    /// 单次捐赠
    #[default]
    OneTime,
    /// 按月捐赠
    Monthly,
    /// 按年捐赠
    Yearly,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::OneTime => "one-time",
            DonationType::Monthly => "monthly",
            DonationType::Yearly => "yearly",
        }
    }
}

/// 捐赠人提交的表单数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorDetails {
    /// 捐赠人姓名
    pub donor_name: String,
    /// 捐赠人邮箱
    pub donor_email: String,
    /// 捐赠人手机号
    pub donor_phone: String,
    /// 捐赠金额
    pub amount: Decimal,
    /// 捐赠周期
    #[serde(default)]
    pub donation_type: DonationType,
    /// 受益人 (可选)
    #[serde(default)]
    pub beneficiary: Option<String>,
    /// 捐赠用途 (可选)
    #[serde(default)]
    pub purpose: Option<String>,
}

impl DonorDetails {
    /// 金额的网关字符串形式，去掉多余的尾随零 (100.00 -> "100")
    pub fn amount_string(&self) -> String {
        self.amount.normalize().to_string()
    }

    /// 非空的受益人
    pub fn beneficiary(&self) -> Option<&str> {
        self.beneficiary.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// 非空的用途
    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// 捐赠记录状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    /// 处理中
    Pending,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
}

impl DonationStatus {
    /// 由回调后的交易状态得出记录状态
    ///
    /// 验证失败的回调不产生记录
    pub fn from_state(state: TransactionState) -> Option<Self> {
        match state {
            TransactionState::VerifiedSuccess => Some(DonationStatus::Completed),
            TransactionState::VerifiedFailure => Some(DonationStatus::Failed),
            TransactionState::Pending => Some(DonationStatus::Pending),
            TransactionState::Initiated
            | TransactionState::AwaitingCallback
            | TransactionState::VerificationFailed => None,
        }
    }

    /// 已存储记录对应的交易状态
    pub fn state(&self) -> TransactionState {
        match self {
            DonationStatus::Completed => TransactionState::VerifiedSuccess,
            DonationStatus::Failed => TransactionState::VerifiedFailure,
            DonationStatus::Pending => TransactionState::Pending,
        }
    }
}

/// 捐赠记录
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DonationRecord {
    /// 记录唯一标识符
    pub id: Uuid,
    /// 交易号
    pub transaction_id: String,
    /// 捐赠金额
    pub amount: Decimal,
    /// 捐赠人姓名
    pub donor_name: String,
    /// 捐赠人邮箱
    pub donor_email: String,
    /// 捐赠人手机号
    pub donor_phone: String,
    /// 捐赠周期 (udf3)
    pub donation_type: String,
    /// 捐赠用途 (udf2)
    pub purpose: Option<String>,
    /// 受益人 (udf1)
    pub beneficiary: Option<String>,
    /// 记录状态
    pub status: DonationStatus,
    /// 网关支付ID
    pub gateway_payment_id: Option<String>,
    /// 支付渠道
    pub payment_method: String,
    /// 支付方式 (网关返回)
    pub payment_mode: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl DonationRecord {
    /// 由已验证的回调构造捐赠记录
    ///
    /// # Arguments
    /// * `response` - 已通过签名验证的回调
    /// * `status` - 记录状态
    pub fn from_verified(response: &PaymentResponse, status: DonationStatus) -> Result<Self> {
        let amount = Decimal::from_str(response.amount.trim())
            .with_context(|| format!("Invalid amount in callback: {:?}", response.amount))?;
        let now = Utc::now();
        let non_empty = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());

        // phone、mode、支付ID 不在回调签名内，按列宽截断后保存

        Ok(Self {
            id: Uuid::new_v4(),
            transaction_id: response.txnid.clone(),
            amount,
            donor_name: response.firstname.clone(),
            donor_email: response.email.clone(),
            donor_phone: truncate(&response.phone, MAX_PHONE_LENGTH),
            donation_type: response.udf.get(2).to_string(),
            purpose: non_empty(response.udf.get(1)),
            beneficiary: non_empty(response.udf.get(0)),
            status,
            gateway_payment_id: response
                .gateway_payment_id()
                .map(|id| truncate(&id, MAX_GATEWAY_PAYMENT_ID_LENGTH)),
            payment_method: "payu".to_string(),
            payment_mode: non_empty(&truncate(&response.mode, MAX_PAYMENT_MODE_LENGTH)),
            created_at: now,
            updated_at: now,
        })
    }

    /// 是否已完成
    pub fn is_completed(&self) -> bool {
        self.status == DonationStatus::Completed
    }

    /// 已存储的支付结果 (失败原因不落库)
    pub fn outcome(&self) -> PaymentOutcome {
        match self.status {
            DonationStatus::Completed => PaymentOutcome::Succeeded {
                gateway_payment_id: self.gateway_payment_id.clone(),
            },
            DonationStatus::Failed => PaymentOutcome::Failed { reason: None },
            DonationStatus::Pending => PaymentOutcome::Pending,
        }
    }
}

/// 按字符数截断
fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// 捐赠状态查询视图 (不含捐赠人联系方式)
#[derive(Debug, Serialize)]
pub struct DonationStatusView {
    /// 交易号
    pub transaction_id: String,
    /// 记录状态
    pub status: DonationStatus,
    /// 捐赠金额
    pub amount: Decimal,
    /// 网关支付ID
    pub gateway_payment_id: Option<String>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<DonationRecord> for DonationStatusView {
    fn from(record: DonationRecord) -> Self {
        Self {
            transaction_id: record.transaction_id,
            status: record.status,
            amount: record.amount,
            gateway_payment_id: record.gateway_payment_id,
            updated_at: record.updated_at,
        }
    }
}

/// 保存结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// 新记录
    Inserted,
    /// 由处理中转为最终状态
    Updated,
    /// 重复回调，已忽略
    Duplicate,
}

impl SaveResult {
    /// 是否产生了状态变化
    pub fn is_change(&self) -> bool {
        !matches!(self, SaveResult::Duplicate)
    }
}

/// 捐赠总额响应
#[derive(Debug, Serialize)]
pub struct DonationTotalResponse {
    /// 已完成捐赠总额
    pub total_amount: Decimal,
    /// 币种
    pub currency: String,
}
