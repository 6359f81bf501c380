// 配置管理模块
// 负责加载和管理应用程序配置

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::models::GatewayMode;
use crate::utils::{validate_url, MAX_TXN_PREFIX_LENGTH};

/// 应用程序配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 服务器配置
    pub server: ServerConfig,
    /// 支付网关配置
    pub payu: PayuConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 邮件通知配置
    pub notification: NotificationConfig,
    /// UPI配置
    pub upi: UpiConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 服务器监听地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 工作线程数
    pub workers: Option<usize>,
    /// 对外访问地址 (用于拼接回调URL)
    pub public_base_url: String,
    /// 允许跨域的前端地址
    pub allowed_origins: Vec<String>,
}

/// 支付网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayuConfig {
    /// 商户Key
    pub merchant_key: String,
    /// 签名盐值 (不在任何响应或日志中输出)
    #[serde(skip_serializing)]
    pub salt: String,
    /// 商户ID
    pub merchant_id: Option<String>,
    /// 网关环境
    pub mode: GatewayMode,
    /// 成功回调地址
    pub success_url: String,
    /// 失败回调地址
    pub failure_url: String,
    /// 服务提供方
    pub service_provider: Option<String>,
    /// 交易号前缀
    pub txn_prefix: String,
    /// 机构名称 (用于商品描述)
    pub organisation_name: String,
    /// 机构来源标识 (写入 udf4)
    pub organisation_tag: String,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接URL，未配置时使用内存存储
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间 (秒)
    pub connect_timeout: u64,
}

/// 邮件通知配置 (EmailJS)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// EmailJS 服务ID
    pub service_id: Option<String>,
    /// 捐赠通知模板ID
    pub template_id: Option<String>,
    /// EmailJS 公钥
    pub public_key: Option<String>,
    /// EmailJS 私钥 (服务端调用需要)
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    /// 管理员邮箱
    pub admin_email: String,
    /// 请求超时时间 (秒)
    pub timeout: u64,
}

impl NotificationConfig {
    /// 是否启用邮件通知
    pub fn is_enabled(&self) -> bool {
        self.service_id.is_some() && self.template_id.is_some() && self.public_key.is_some()
    }
}

/// UPI配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpiConfig {
    /// 收款UPI ID，未配置时不提供UPI链接
    pub upi_id: Option<String>,
    /// 收款方名称
    pub merchant_name: String,
    /// 商户代码
    pub merchant_code: Option<String>,
    /// 币种
    pub currency: String,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 通过查找函数加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let var_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let public_base_url = var_or("PUBLIC_BASE_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();
        let organisation_name = var_or("ORGANISATION_NAME", "Basava Yuva Brigade");

        Ok(Config {
            server: ServerConfig {
                host: var_or("SERVER_HOST", "127.0.0.1"),
                port: var_or("SERVER_PORT", "8080")
                    .parse()
                    .context("Invalid SERVER_PORT")?,
                workers: var("SERVER_WORKERS")
                    .map(|s| s.parse())
                    .transpose()
                    .context("Invalid SERVER_WORKERS")?,
                allowed_origins: var("ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(|origin| origin.trim().to_string())
                            .filter(|origin| !origin.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                public_base_url: public_base_url.clone(),
            },
            payu: PayuConfig {
                merchant_key: var("PAYU_MERCHANT_KEY")
                    .context("PAYU_MERCHANT_KEY environment variable is required")?,
                salt: var("PAYU_SALT").context("PAYU_SALT environment variable is required")?,
                merchant_id: var("PAYU_MERCHANT_ID"),
                mode: var_or("PAYU_MODE", "test")
                    .parse::<GatewayMode>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid PAYU_MODE")?,
                success_url: var("PAYU_SUCCESS_URL")
                    .unwrap_or_else(|| format!("{}/payment/success", public_base_url)),
                failure_url: var("PAYU_FAILURE_URL")
                    .unwrap_or_else(|| format!("{}/payment/failure", public_base_url)),
                service_provider: Some(var_or("PAYU_SERVICE_PROVIDER", "payu_paisa"))
                    .filter(|s| s != "none"),
                txn_prefix: var_or("TXN_PREFIX", "BYB"),
                organisation_tag: var_or("ORGANISATION_TAG", "basava-yuva-brigade"),
                organisation_name: organisation_name.clone(),
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL"),
                max_connections: var_or("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS")?,
                connect_timeout: var_or("DB_CONNECT_TIMEOUT", "30")
                    .parse()
                    .context("Invalid DB_CONNECT_TIMEOUT")?,
            },
            notification: NotificationConfig {
                service_id: var("EMAILJS_SERVICE_ID"),
                template_id: var("EMAILJS_TEMPLATE_ID"),
                public_key: var("EMAILJS_PUBLIC_KEY"),
                private_key: var("EMAILJS_PRIVATE_KEY"),
                admin_email: var_or("ADMIN_EMAIL", "admin@basava-yuva-brigade.org"),
                timeout: var_or("EMAILJS_TIMEOUT", "10")
                    .parse()
                    .context("Invalid EMAILJS_TIMEOUT")?,
            },
            upi: UpiConfig {
                upi_id: var("UPI_ID"),
                merchant_name: var("UPI_MERCHANT_NAME").unwrap_or(organisation_name),
                merchant_code: var("UPI_MERCHANT_CODE"),
                currency: var_or("UPI_CURRENCY", "INR"),
            },
        })
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        // 验证服务器配置
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        // 验证网关配置
        if self.payu.merchant_key.trim().is_empty() {
            anyhow::bail!("PayU merchant key cannot be empty");
        }

        if self.payu.salt.trim().is_empty() {
            anyhow::bail!("PayU salt cannot be empty");
        }

        if !validate_url(&self.payu.success_url) {
            anyhow::bail!("Invalid PayU success URL: {}", self.payu.success_url);
        }

        if !validate_url(&self.payu.failure_url) {
            anyhow::bail!("Invalid PayU failure URL: {}", self.payu.failure_url);
        }

        if self.payu.txn_prefix.is_empty()
            || self.payu.txn_prefix.len() > MAX_TXN_PREFIX_LENGTH
            || !self.payu.txn_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            anyhow::bail!(
                "Transaction prefix must be alphanumeric and 1 to {} characters",
                MAX_TXN_PREFIX_LENGTH
            );
        }

        // 参与签名的配置项不能包含分隔符
        for (name, value) in [
            ("PAYU_MERCHANT_KEY", &self.payu.merchant_key),
            ("ORGANISATION_NAME", &self.payu.organisation_name),
            ("ORGANISATION_TAG", &self.payu.organisation_tag),
        ] {
            if value.contains('|') {
                anyhow::bail!("{} must not contain '|'", name);
            }
        }

        // 验证数据库配置
        if self.database.max_connections == 0 {
            anyhow::bail!("Database max connections must be positive");
        }

        // 验证UPI配置
        if let Some(upi_id) = &self.upi.upi_id {
            if !upi_id.contains('@') {
                anyhow::bail!("Invalid UPI ID: {}", upi_id);
            }
        }

        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_missing_merchant_key_fails() {
        let err = load(&[("PAYU_SALT", "S1")]).unwrap_err();
        assert!(err.to_string().contains("PAYU_MERCHANT_KEY"));
    }

    #[test]
    fn test_missing_salt_fails() {
        let err = load(&[("PAYU_MERCHANT_KEY", "K1"), ("PAYU_SALT", "  ")]).unwrap_err();
        assert!(err.to_string().contains("PAYU_SALT"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("PAYU_MERCHANT_KEY", "K1"), ("PAYU_SALT", "S1")]).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.payu.mode, GatewayMode::Test);
        assert_eq!(config.payu.success_url, "http://localhost:8080/payment/success");
        assert_eq!(config.payu.failure_url, "http://localhost:8080/payment/failure");
        assert_eq!(config.payu.service_provider.as_deref(), Some("payu_paisa"));
        assert_eq!(config.payu.txn_prefix, "BYB");
        assert!(config.database.url.is_none());
        assert!(!config.notification.is_enabled());
        assert!(config.upi.upi_id.is_none());
        assert_eq!(config.upi.merchant_name, "Basava Yuva Brigade");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("PAYU_MODE", "live"),
            ("PUBLIC_BASE_URL", "https://donate.example.org/"),
            ("PAYU_SERVICE_PROVIDER", "none"),
            ("ALLOWED_ORIGINS", "https://example.org, https://www.example.org"),
            ("EMAILJS_SERVICE_ID", "service_1"),
            ("EMAILJS_TEMPLATE_ID", "template_1"),
            ("EMAILJS_PUBLIC_KEY", "pk"),
            ("UPI_ID", "donate@oksbi"),
        ])
        .unwrap();

        assert_eq!(config.payu.mode, GatewayMode::Live);
        assert_eq!(config.payu.success_url, "https://donate.example.org/payment/success");
        assert_eq!(config.payu.service_provider, None);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://example.org".to_string(), "https://www.example.org".to_string()]
        );
        assert!(config.notification.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("PAYU_MODE", "staging"),
        ])
        .is_err());

        assert!(load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("SERVER_PORT", "eighty"),
        ])
        .is_err());

        let config = load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("PAYU_SUCCESS_URL", "not a url"),
        ])
        .unwrap();
        assert!(config.validate().is_err());

        let config = load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("UPI_ID", "not-a-vpa"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signed_settings_are_bounded() {
        let longest = "B".repeat(MAX_TXN_PREFIX_LENGTH);
        let too_long = "B".repeat(MAX_TXN_PREFIX_LENGTH + 1);

        let config = load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("TXN_PREFIX", longest.as_str()),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
        assert!(crate::utils::is_well_formed_transaction_id(
            &crate::utils::generate_transaction_id(&config.payu.txn_prefix)
        ));

        let config = load(&[
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("TXN_PREFIX", too_long.as_str()),
        ])
        .unwrap();
        assert!(config.validate().is_err());

        for name in ["ORGANISATION_NAME", "ORGANISATION_TAG", "PAYU_MERCHANT_KEY"] {
            let mut pairs = vec![("PAYU_MERCHANT_KEY", "K1"), ("PAYU_SALT", "S1")];
            pairs.retain(|(k, _)| *k != name);
            pairs.push((name, "a|b"));
            let err = load(&pairs).unwrap().validate().unwrap_err();
            assert!(err.to_string().contains(name));
        }
    }

    #[test]
    fn test_salt_is_never_serialized() {
        let config = load(&[("PAYU_MERCHANT_KEY", "K1"), ("PAYU_SALT", "secret-salt")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-salt"));
    }
}
