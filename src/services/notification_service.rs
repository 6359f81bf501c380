// 捐赠通知服务
// 捐赠完成后通过 EmailJS 通知管理员，未配置时仅记录日志

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::NotificationConfig;
use crate::models::DonationRecord;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// 捐赠通知
#[async_trait]
pub trait DonationNotifier: Send + Sync {
    /// 发送捐赠完成通知
    async fn notify_donation(&self, record: &DonationRecord) -> Result<()>;
}

/// 模板参数
#[derive(Debug, Serialize, PartialEq)]
pub struct DonationTemplateParams {
    pub to_name: String,
    pub to_email: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub donor_name: String,
    pub donor_email: String,
    pub donation_amount: String,
    pub donation_type: String,
    pub is_anonymous: bool,
    pub transaction_id: String,
    pub submission_date: String,
    pub reply_to: String,
}

impl DonationTemplateParams {
    pub fn from_record(record: &DonationRecord, admin_email: &str) -> Self {
        Self {
            to_name: "Admin".to_string(),
            to_email: admin_email.to_string(),
            from_name: record.donor_name.clone(),
            from_email: record.donor_email.clone(),
            subject: format!("New Donation: ₹{}", record.amount),
            donor_name: record.donor_name.clone(),
            donor_email: record.donor_email.clone(),
            donation_amount: record.amount.to_string(),
            donation_type: record.donation_type.clone(),
            is_anonymous: record.donor_name.eq_ignore_ascii_case("anonymous"),
            transaction_id: record.transaction_id.clone(),
            submission_date: record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reply_to: record.donor_email.clone(),
        }
    }
}

/// EmailJS 请求体
#[derive(Debug, Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: DonationTemplateParams,
}

/// EmailJS 通知
pub struct EmailJsNotifier {
    client: Client,
    service_id: String,
    template_id: String,
    public_key: String,
    private_key: Option<String>,
    admin_email: String,
}

impl EmailJsNotifier {
    /// 根据配置创建，配置不完整时返回 None
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>> {
        let (Some(service_id), Some(template_id), Some(public_key)) = (
            config.service_id.clone(),
            config.template_id.clone(),
            config.public_key.clone(),
        ) else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("donapay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Some(Self {
            client,
            service_id,
            template_id,
            public_key,
            private_key: config.private_key.clone(),
            admin_email: config.admin_email.clone(),
        }))
    }
}

#[async_trait]
impl DonationNotifier for EmailJsNotifier {
    async fn notify_donation(&self, record: &DonationRecord) -> Result<()> {
        let body = EmailJsRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            access_token: self.private_key.as_deref(),
            template_params: DonationTemplateParams::from_record(record, &self.admin_email),
        };

        let response = self
            .client
            .post(EMAILJS_SEND_URL)
            .json(&body)
            .send()
            .await
            .context("Failed to reach EmailJS")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("EmailJS rejected notification ({}): {}", status, text);
        }

        log::info!("Donation notification sent for {}", record.transaction_id);
        Ok(())
    }
}

/// 仅记录日志的通知
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl DonationNotifier for LogNotifier {
    async fn notify_donation(&self, record: &DonationRecord) -> Result<()> {
        log::info!(
            "Donation completed: {} amount={} type={}",
            record.transaction_id,
            record.amount,
            record.donation_type
        );
        Ok(())
    }
}

/// 记录调用的通知 (测试用)
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: tokio::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
#[async_trait]
impl DonationNotifier for RecordingNotifier {
    async fn notify_donation(&self, record: &DonationRecord) -> Result<()> {
        self.sent.lock().await.push(record.transaction_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DonationStatus, ExtraFields, PaymentResponse};

    fn completed_record() -> DonationRecord {
        let response = PaymentResponse {
            mihpayid: "403993715".to_string(),
            status: "success".to_string(),
            txnid: "BYB_1_abc".to_string(),
            amount: "500.00".to_string(),
            firstname: "Asha".to_string(),
            email: "a@x.com".to_string(),
            udf: ExtraFields::from_values(["", "", "monthly"]),
            ..Default::default()
        };
        DonationRecord::from_verified(&response, DonationStatus::Completed).unwrap()
    }

    fn notification_config() -> NotificationConfig {
        NotificationConfig {
            service_id: Some("service_1".to_string()),
            template_id: Some("template_donation_notification".to_string()),
            public_key: Some("pk".to_string()),
            private_key: None,
            admin_email: "admin@example.org".to_string(),
            timeout: 5,
        }
    }

    #[test]
    fn test_template_params() {
        let params = DonationTemplateParams::from_record(&completed_record(), "admin@example.org");

        assert_eq!(params.to_email, "admin@example.org");
        assert_eq!(params.donor_name, "Asha");
        assert_eq!(params.donation_amount, "500.00");
        assert_eq!(params.donation_type, "monthly");
        assert_eq!(params.reply_to, "a@x.com");
        assert!(!params.is_anonymous);
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmailJsRequest {
            service_id: "service_1",
            template_id: "template_1",
            user_id: "pk",
            access_token: None,
            template_params: DonationTemplateParams::from_record(&completed_record(), "admin@example.org"),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["service_id"], "service_1");
        assert_eq!(json["user_id"], "pk");
        assert!(json.get("accessToken").is_none());
        assert_eq!(json["template_params"]["transaction_id"], "BYB_1_abc");
    }

    #[test]
    fn test_from_config() {
        assert!(EmailJsNotifier::from_config(&notification_config()).unwrap().is_some());

        let mut config = notification_config();
        config.template_id = None;
        assert!(EmailJsNotifier::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::default();
        notifier.notify_donation(&completed_record()).await.unwrap();
        assert_eq!(*notifier.sent.lock().await, vec!["BYB_1_abc".to_string()]);

        assert!(LogNotifier.notify_donation(&completed_record()).await.is_ok());
    }
}
