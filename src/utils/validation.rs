// 数据验证工具函数
// 提供捐赠表单数据的服务端格式检查

use anyhow::Result;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 交易号最大长度
const MAX_TRANSACTION_ID_LENGTH: usize = 64;

/// 交易号前缀最大长度 (前缀 + 时间戳 + 随机串不得超过交易号最大长度)
pub const MAX_TXN_PREFIX_LENGTH: usize = 32;

/// 验证邮箱地址格式
///
/// # Arguments
/// * `email` - 邮箱地址字符串
///
/// # Returns
/// * 邮箱是否有效
pub fn validate_email(email: &str) -> bool {
    let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email regex is valid");
    email_regex.is_match(email)
}

/// 验证手机号格式 (可带+号和国家码，7到15位数字)
pub fn validate_phone(phone: &str) -> bool {
    let phone_regex = Regex::new(r"^\+?[0-9]{7,15}$").expect("phone regex is valid");
    phone_regex.is_match(phone)
}

/// 验证URL格式
///
/// # Arguments
/// * `url` - URL字符串
///
/// # Returns
/// * URL是否有效
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// 验证捐赠金额
///
/// 金额必须为正数，且最多两位小数
pub fn validate_donation_amount(amount: &Decimal) -> Result<()> {
    if *amount <= Decimal::ZERO {
        anyhow::bail!("Donation amount must be positive");
    }

    if amount.normalize().scale() > 2 {
        anyhow::bail!("Donation amount supports at most two decimal places");
    }

    Ok(())
}

/// 检查交易号格式
///
/// 只允许字母、数字、下划线、连字符
pub fn is_well_formed_transaction_id(txnid: &str) -> bool {
    !txnid.is_empty()
        && txnid.len() <= MAX_TRANSACTION_ID_LENGTH
        && txnid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// 通用输入验证器
pub struct InputValidator {
    errors: HashMap<String, Vec<String>>,
}

impl InputValidator {
    /// 创建新的验证器
    pub fn new() -> Self {
        Self {
            errors: HashMap::new(),
        }
    }

    /// 添加字段验证错误
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// 验证必填字段
    pub fn validate_required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, "This field is required");
        }
    }

    /// 验证字符串长度
    pub fn validate_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.add_error(field, &format!("Must be at least {} characters", min));
        }
        if len > max {
            self.add_error(field, &format!("Must be at most {} characters", max));
        }
    }

    /// 验证邮箱格式
    pub fn validate_email_field(&mut self, field: &str, email: &str) {
        if !validate_email(email) {
            self.add_error(field, "Invalid email format");
        }
    }

    /// 验证手机号格式
    pub fn validate_phone_field(&mut self, field: &str, phone: &str) {
        if !validate_phone(phone) {
            self.add_error(field, "Invalid phone number");
        }
    }

    /// 验证捐赠金额
    pub fn validate_amount_field(&mut self, field: &str, amount: &Decimal) {
        if let Err(e) = validate_donation_amount(amount) {
            self.add_error(field, &e.to_string());
        }
    }

    /// 检查是否有验证错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 获取验证错误
    pub fn get_errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    /// 转换为错误结果
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            let mut fields: Vec<_> = self.errors.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));

            let error_msg = fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; ");

            anyhow::bail!("Validation failed: {}", error_msg);
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com"));
        assert!(validate_email("user.name+tag@domain.co.in"));

        assert!(!validate_email("invalid-email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210"));
        assert!(validate_phone("+919876543210"));

        assert!(!validate_phone("98765"));
        assert!(!validate_phone("98765-43210"));
        assert!(!validate_phone(""));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.org/payment/success"));
        assert!(validate_url("http://localhost:8080/payment/failure"));

        assert!(!validate_url("ftp://example.org"));
        assert!(!validate_url("not a url"));
    }

    #[test]
    fn test_validate_donation_amount() {
        assert!(validate_donation_amount(&Decimal::new(100, 0)).is_ok());
        assert!(validate_donation_amount(&Decimal::new(10050, 2)).is_ok());
        assert!(validate_donation_amount(&Decimal::new(100000, 3)).is_ok()); // 100.000

        assert!(validate_donation_amount(&Decimal::ZERO).is_err());
        assert!(validate_donation_amount(&Decimal::new(-1, 0)).is_err());
        assert!(validate_donation_amount(&Decimal::new(1001, 3)).is_err());
    }

    #[test]
    fn test_is_well_formed_transaction_id() {
        assert!(is_well_formed_transaction_id("BYB_1718000000000_abc123def456"));
        assert!(is_well_formed_transaction_id("T1"));

        assert!(!is_well_formed_transaction_id(""));
        assert!(!is_well_formed_transaction_id("BYB 1718"));
        assert!(!is_well_formed_transaction_id("T1|K1"));
        assert!(!is_well_formed_transaction_id(&"x".repeat(65)));
    }

    #[test]
    fn test_input_validator() {
        let mut validator = InputValidator::new();

        validator.validate_required("donor_name", "");
        validator.validate_email_field("donor_email", "invalid-email");
        validator.validate_amount_field("amount", &Decimal::ZERO);

        assert!(validator.has_errors());
        assert_eq!(validator.get_errors().len(), 3);

        let err = validator.into_result().unwrap_err().to_string();
        assert!(err.starts_with("Validation failed: amount"));
    }
}
