// 支付请求/回调数据模型
// 定义网关表单字段、回调载荷、支付结果以及交易状态机

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// 网关环境
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// 测试环境
    #[default]
    Test,
    /// 生产环境
    Live,
}

impl GatewayMode {
    /// 获取网关支付地址
    pub fn endpoint(&self) -> &'static str {
        match self {
            GatewayMode::Test => "https://test.payu.in/_payment",
            GatewayMode::Live => "https://secure.payu.in/_payment",
        }
    }
}

impl std::str::FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "sandbox" => Ok(GatewayMode::Test),
            "live" | "production" => Ok(GatewayMode::Live),
            other => Err(format!("unknown gateway mode: {}", other)),
        }
    }
}

/// 自定义扩展字段 udf1..udf5
///
/// 顺序固定，缺失字段在签名时按空字符串处理
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFields {
    /// 受益人ID
    pub udf1: Option<String>,
    /// 捐赠用途
    pub udf2: Option<String>,
    /// 捐赠周期
    pub udf3: Option<String>,
    /// 来源标识
    pub udf4: Option<String>,
    /// 保留
    pub udf5: Option<String>,
}

impl ExtraFields {
    /// 字段名称，按签名顺序排列
    pub const NAMES: [&'static str; 5] = ["udf1", "udf2", "udf3", "udf4", "udf5"];

    /// 按顺序从最多5个值构造，多余的值被忽略
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = Self::default();
        for (index, value) in values.into_iter().take(5).enumerate() {
            *fields.slot_mut(index) = Some(value.into());
        }
        fields
    }

    /// 获取第 `index` 个字段 (0起始)，缺失时为空字符串
    pub fn get(&self, index: usize) -> &str {
        let slot = match index {
            0 => &self.udf1,
            1 => &self.udf2,
            2 => &self.udf3,
            3 => &self.udf4,
            4 => &self.udf5,
            _ => return "",
        };
        slot.as_deref().unwrap_or("")
    }

    /// 按 udf1..udf5 顺序返回全部字段
    pub fn as_array(&self) -> [&str; 5] {
        [self.get(0), self.get(1), self.get(2), self.get(3), self.get(4)]
    }

    fn slot_mut(&mut self, index: usize) -> &mut Option<String> {
        match index {
            0 => &mut self.udf1,
            1 => &mut self.udf2,
            2 => &mut self.udf3,
            3 => &mut self.udf4,
            _ => &mut self.udf5,
        }
    }
}

/// 参与签名的字段视图
#[derive(Debug, Clone, Copy)]
pub struct HashFields<'a> {
    pub key: &'a str,
    pub txnid: &'a str,
    pub amount: &'a str,
    pub productinfo: &'a str,
    pub firstname: &'a str,
    pub email: &'a str,
    pub udf: &'a ExtraFields,
}

/// 提交到网关的支付请求
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// 商户Key
    pub key: String,
    /// 交易号
    pub txnid: String,
    /// 金额 (字符串形式，必须与回调完全一致)
    pub amount: String,
    /// 商品描述
    pub productinfo: String,
    /// 捐赠人姓名
    pub firstname: String,
    /// 捐赠人邮箱
    pub email: String,
    /// 捐赠人手机号
    pub phone: String,
    /// 成功回调地址
    pub surl: String,
    /// 失败回调地址
    pub furl: String,
    /// 请求签名
    pub hash: String,
    /// 服务提供方
    pub service_provider: Option<String>,
    /// 扩展字段
    pub udf: ExtraFields,
}

impl PaymentRequest {
    /// 签名字段视图
    pub fn hash_fields(&self) -> HashFields<'_> {
        HashFields {
            key: &self.key,
            txnid: &self.txnid,
            amount: &self.amount,
            productinfo: &self.productinfo,
            firstname: &self.firstname,
            email: &self.email,
            udf: &self.udf,
        }
    }

    /// 按网关表单顺序展开全部字段，空的扩展字段以空字符串提交
    pub fn form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::new("key", &self.key),
            FormField::new("txnid", &self.txnid),
            FormField::new("amount", &self.amount),
            FormField::new("productinfo", &self.productinfo),
            FormField::new("firstname", &self.firstname),
            FormField::new("email", &self.email),
            FormField::new("phone", &self.phone),
            FormField::new("surl", &self.surl),
            FormField::new("furl", &self.furl),
            FormField::new("hash", &self.hash),
        ];

        if let Some(provider) = &self.service_provider {
            fields.push(FormField::new("service_provider", provider));
        }

        for (name, value) in ExtraFields::NAMES.iter().zip(self.udf.as_array()) {
            fields.push(FormField::new(name, value));
        }

        fields
    }
}

/// 表单字段
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// 网关回调载荷
///
/// 由键值对解析而来，缺失字段一律视为空字符串
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentResponse {
    /// 网关支付ID
    pub mihpayid: String,
    /// 支付方式
    pub mode: String,
    /// 网关状态
    pub status: String,
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    /// 网关签名
    pub hash: String,
    pub udf: ExtraFields,
    /// 网关错误信息
    pub error_message: String,
    /// 旧版网关支付ID
    pub payu_money_id: String,
}

impl PaymentResponse {
    /// 从回调参数解析
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let field = |name: &str| params.get(name).cloned().unwrap_or_default();

        Self {
            mihpayid: field("mihpayid"),
            mode: field("mode"),
            status: field("status"),
            key: field("key"),
            txnid: field("txnid"),
            amount: field("amount"),
            productinfo: field("productinfo"),
            firstname: field("firstname"),
            email: field("email"),
            phone: field("phone"),
            hash: field("hash"),
            udf: ExtraFields {
                udf1: params.get("udf1").cloned(),
                udf2: params.get("udf2").cloned(),
                udf3: params.get("udf3").cloned(),
                udf4: params.get("udf4").cloned(),
                udf5: params.get("udf5").cloned(),
            },
            error_message: params
                .get("error_Message")
                .or_else(|| params.get("error_message"))
                .cloned()
                .unwrap_or_default(),
            payu_money_id: field("payuMoneyId"),
        }
    }

    /// 签名字段视图
    pub fn hash_fields(&self) -> HashFields<'_> {
        HashFields {
            key: &self.key,
            txnid: &self.txnid,
            amount: &self.amount,
            productinfo: &self.productinfo,
            firstname: &self.firstname,
            email: &self.email,
            udf: &self.udf,
        }
    }

    /// 网关支付ID (优先 payuMoneyId)
    pub fn gateway_payment_id(&self) -> Option<String> {
        [&self.payu_money_id, &self.mihpayid]
            .into_iter()
            .find(|id| !id.is_empty())
            .cloned()
    }
}

/// 已验证回调的支付结果
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// 支付成功
    Succeeded { gateway_payment_id: Option<String> },
    /// 支付失败
    Failed { reason: Option<String> },
    /// 网关处理中
    Pending,
    /// 无法识别的状态
    Unknown { status: String },
}

impl PaymentOutcome {
    /// 面向捐赠人的提示信息
    pub fn message(&self) -> String {
        match self {
            PaymentOutcome::Succeeded { .. } => "Payment completed successfully!".to_string(),
            PaymentOutcome::Failed { reason } => reason
                .clone()
                .unwrap_or_else(|| "Payment failed. Please try again.".to_string()),
            PaymentOutcome::Pending => {
                "Payment is being processed. You will receive confirmation shortly.".to_string()
            }
            PaymentOutcome::Unknown { .. } => {
                "Payment status unknown. Please contact support.".to_string()
            }
        }
    }
}

/// 回调验证结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackVerdict {
    /// 签名有效，附带分类结果
    Verified(PaymentOutcome),
    /// 签名无效或载荷不完整
    VerificationFailed,
}

/// 交易状态 (客户端视角)
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionState {
    /// 已创建请求
    Initiated,
    /// 已跳转网关，等待回调
    AwaitingCallback,
    /// 验证通过且支付成功
    VerifiedSuccess,
    /// 验证通过但支付失败
    VerifiedFailure,
    /// 验证失败 (按失败处理)
    VerificationFailed,
    /// 处理中，可能再次收到回调或需要人工对账
    Pending,
}

/// 非法状态转换
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("transaction already reached terminal state {0:?}")]
    Terminal(TransactionState),
    #[error("transaction in state {from:?} cannot {event}")]
    Invalid {
        from: TransactionState,
        event: &'static str,
    },
}

impl TransactionState {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::VerifiedSuccess
                | TransactionState::VerifiedFailure
                | TransactionState::VerificationFailed
        )
    }

    /// 跳转至网关
    pub fn submit(self) -> Result<Self, TransitionError> {
        match self {
            TransactionState::Initiated => Ok(TransactionState::AwaitingCallback),
            s if s.is_terminal() => Err(TransitionError::Terminal(s)),
            s => Err(TransitionError::Invalid {
                from: s,
                event: "be submitted",
            }),
        }
    }

    /// 收到回调
    pub fn on_callback(self, verdict: &CallbackVerdict) -> Result<Self, TransitionError> {
        match self {
            TransactionState::AwaitingCallback | TransactionState::Pending => Ok(match verdict {
                CallbackVerdict::VerificationFailed => TransactionState::VerificationFailed,
                CallbackVerdict::Verified(PaymentOutcome::Succeeded { .. }) => {
                    TransactionState::VerifiedSuccess
                }
                CallbackVerdict::Verified(PaymentOutcome::Failed { .. }) => {
                    TransactionState::VerifiedFailure
                }
                CallbackVerdict::Verified(PaymentOutcome::Pending)
                | CallbackVerdict::Verified(PaymentOutcome::Unknown { .. }) => {
                    TransactionState::Pending
                }
            }),
            s if s.is_terminal() => Err(TransitionError::Terminal(s)),
            s => Err(TransitionError::Invalid {
                from: s,
                event: "receive a callback",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_gateway_mode() {
        assert_eq!("test".parse::<GatewayMode>().unwrap(), GatewayMode::Test);
        assert_eq!("LIVE".parse::<GatewayMode>().unwrap(), GatewayMode::Live);
        assert!("staging".parse::<GatewayMode>().is_err());
        assert_eq!(GatewayMode::Live.endpoint(), "https://secure.payu.in/_payment");
    }

    #[test]
    fn test_extra_fields_from_values() {
        let udf = ExtraFields::from_values(["ben-7", "education"]);
        assert_eq!(udf.as_array(), ["ben-7", "education", "", "", ""]);
        assert_eq!(udf.udf3, None);

        let udf = ExtraFields::from_values(vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(udf.as_array(), ["a", "b", "c", "d", "e"]);
        assert_eq!(udf.get(7), "");
    }

    #[test]
    fn test_response_from_params_missing_fields() {
        let response = PaymentResponse::from_params(&params(&[
            ("status", "success"),
            ("txnid", "T1"),
            ("udf3", "monthly"),
            ("error_Message", "No Error"),
        ]));

        assert_eq!(response.status, "success");
        assert_eq!(response.txnid, "T1");
        assert_eq!(response.hash, "");
        assert_eq!(response.key, "");
        assert_eq!(response.udf.as_array(), ["", "", "monthly", "", ""]);
        assert_eq!(response.error_message, "No Error");
        assert_eq!(response.gateway_payment_id(), None);
    }

    #[test]
    fn test_gateway_payment_id_preference() {
        let response = PaymentResponse::from_params(&params(&[("mihpayid", "403993715")]));
        assert_eq!(response.gateway_payment_id().as_deref(), Some("403993715"));

        let response = PaymentResponse::from_params(&params(&[
            ("mihpayid", "403993715"),
            ("payuMoneyId", "250"),
        ]));
        assert_eq!(response.gateway_payment_id().as_deref(), Some("250"));
    }

    #[test]
    fn test_form_fields_order_and_empty_udf() {
        let request = PaymentRequest {
            key: "K1".to_string(),
            txnid: "T1".to_string(),
            amount: "100".to_string(),
            productinfo: "Donation".to_string(),
            firstname: "Asha".to_string(),
            email: "a@x.com".to_string(),
            phone: "9876543210".to_string(),
            surl: "https://example.org/payment/success".to_string(),
            furl: "https://example.org/payment/failure".to_string(),
            hash: "abc".to_string(),
            service_provider: Some("payu_paisa".to_string()),
            udf: ExtraFields::from_values(["ben-7"]),
        };

        let fields = request.form_fields();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "key", "txnid", "amount", "productinfo", "firstname", "email", "phone", "surl",
                "furl", "hash", "service_provider", "udf1", "udf2", "udf3", "udf4", "udf5"
            ]
        );
        assert_eq!(fields[11].value, "ben-7");
        assert_eq!(fields[12].value, "");
    }

    #[test]
    fn test_state_machine_happy_path() {
        let state = TransactionState::Initiated.submit().unwrap();
        assert_eq!(state, TransactionState::AwaitingCallback);

        let verdict = CallbackVerdict::Verified(PaymentOutcome::Succeeded {
            gateway_payment_id: Some("1".to_string()),
        });
        assert_eq!(state.on_callback(&verdict).unwrap(), TransactionState::VerifiedSuccess);
    }

    #[test]
    fn test_state_machine_pending_then_final() {
        let state = TransactionState::AwaitingCallback
            .on_callback(&CallbackVerdict::Verified(PaymentOutcome::Pending))
            .unwrap();
        assert_eq!(state, TransactionState::Pending);
        assert!(!state.is_terminal());

        let failed = CallbackVerdict::Verified(PaymentOutcome::Failed { reason: None });
        assert_eq!(state.on_callback(&failed).unwrap(), TransactionState::VerifiedFailure);

        let unknown = CallbackVerdict::Verified(PaymentOutcome::Unknown {
            status: "bounced".to_string(),
        });
        assert_eq!(
            TransactionState::AwaitingCallback.on_callback(&unknown).unwrap(),
            TransactionState::Pending
        );
    }

    #[test]
    fn test_state_machine_terminal_states() {
        let verdict = CallbackVerdict::Verified(PaymentOutcome::Succeeded {
            gateway_payment_id: None,
        });

        for terminal in [
            TransactionState::VerifiedSuccess,
            TransactionState::VerifiedFailure,
            TransactionState::VerificationFailed,
        ] {
            assert!(terminal.is_terminal());
            assert_eq!(
                terminal.on_callback(&verdict),
                Err(TransitionError::Terminal(terminal))
            );
            assert_eq!(terminal.submit(), Err(TransitionError::Terminal(terminal)));
        }

        assert_eq!(
            TransactionState::VerificationFailed.on_callback(&CallbackVerdict::VerificationFailed),
            Err(TransitionError::Terminal(TransactionState::VerificationFailed))
        );
    }

    #[test]
    fn test_state_machine_invalid_transitions() {
        assert!(matches!(
            TransactionState::Initiated.on_callback(&CallbackVerdict::VerificationFailed),
            Err(TransitionError::Invalid { .. })
        ));
        assert!(matches!(
            TransactionState::AwaitingCallback.submit(),
            Err(TransitionError::Invalid { .. })
        ));
    }

    #[test]
    fn test_verification_failure_is_terminal() {
        let state = TransactionState::AwaitingCallback
            .on_callback(&CallbackVerdict::VerificationFailed)
            .unwrap();
        assert_eq!(state, TransactionState::VerificationFailed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_outcome_messages() {
        let failed = PaymentOutcome::Failed {
            reason: Some("Bank declined".to_string()),
        };
        assert_eq!(failed.message(), "Bank declined");
        assert_eq!(
            PaymentOutcome::Failed { reason: None }.message(),
            "Payment failed. Please try again."
        );
    }
}
