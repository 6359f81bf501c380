// 应用状态管理
// 包含网关客户端、捐赠存储、通知服务等全局状态

use std::sync::Arc;

use crate::config::Config;
use crate::services::{DonationNotifier, DonationRepository, PayuClient, UpiService};

/// 应用全局状态
pub struct AppState {
    /// 应用配置
    pub config: Config,
    /// 支付网关客户端
    pub payu: PayuClient,
    /// 捐赠记录存储
    pub donations: Arc<dyn DonationRepository>,
    /// 捐赠通知
    pub notifier: Arc<dyn DonationNotifier>,
    /// UPI服务 (未配置时为 None)
    pub upi: Option<UpiService>,
}

impl AppState {
    /// 创建新的应用状态实例
    ///
    /// # Arguments
    /// * `config` - 应用配置
    /// * `payu` - 支付网关客户端
    /// * `donations` - 捐赠记录存储
    /// * `notifier` - 捐赠通知
    ///
    /// # Returns
    /// * 应用状态实例
    pub fn new(
        config: Config,
        payu: PayuClient,
        donations: Arc<dyn DonationRepository>,
        notifier: Arc<dyn DonationNotifier>,
    ) -> Self {
        let upi = UpiService::from_config(&config.upi, &config.payu.txn_prefix);

        Self {
            config,
            payu,
            donations,
            notifier,
            upi,
        }
    }

    /// 创建测试用的应用状态 (内存存储，无需数据库或网络)
    #[cfg(test)]
    pub fn new_for_test(notifier: Arc<dyn DonationNotifier>) -> Self {
        use crate::services::InMemoryDonationRepository;
        use std::collections::HashMap;

        let vars: HashMap<&str, &str> = [
            ("PAYU_MERCHANT_KEY", "K1"),
            ("PAYU_SALT", "S1"),
            ("PUBLIC_BASE_URL", "https://donate.example.org"),
            ("UPI_ID", "donate@oksbi"),
            ("UPI_MERCHANT_CODE", "BYB001"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .expect("test configuration is valid");
        let payu = PayuClient::new(config.payu.clone()).expect("test credentials are set");

        Self::new(
            config,
            payu,
            Arc::new(InMemoryDonationRepository::new()),
            notifier,
        )
    }
}
