// UPI支付数据模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 支持的UPI应用
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpiApp {
    PhonePe,
    Paytm,
    GooglePay,
    Bhim,
    AmazonPay,
    Mobikwik,
    /// 任意UPI应用
    #[default]
    Generic,
}

impl UpiApp {
    pub const ALL: [UpiApp; 7] = [
        UpiApp::PhonePe,
        UpiApp::Paytm,
        UpiApp::GooglePay,
        UpiApp::Bhim,
        UpiApp::AmazonPay,
        UpiApp::Mobikwik,
        UpiApp::Generic,
    ];

    /// 深度链接前缀
    pub fn scheme(&self) -> &'static str {
        match self {
            UpiApp::PhonePe => "phonepe://pay",
            UpiApp::Paytm => "paytmmp://pay",
            UpiApp::GooglePay => "tez://upi/pay",
            UpiApp::Bhim => "bhim://pay",
            UpiApp::AmazonPay => "amazonpay://pay",
            UpiApp::Mobikwik => "mobikwik://upi/pay",
            UpiApp::Generic => "upi://pay",
        }
    }

    /// 展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            UpiApp::PhonePe => "PhonePe",
            UpiApp::Paytm => "Paytm",
            UpiApp::GooglePay => "Google Pay",
            UpiApp::Bhim => "BHIM",
            UpiApp::AmazonPay => "Amazon Pay",
            UpiApp::Mobikwik => "MobiKwik",
            UpiApp::Generic => "Other UPI Apps",
        }
    }
}

/// UPI链接生成请求
#[derive(Debug, Clone, Deserialize)]
pub struct UpiLinkRequest {
    /// 捐赠人姓名
    pub donor_name: String,
    /// 捐赠金额
    pub amount: Decimal,
    /// 是否匿名
    #[serde(default)]
    pub is_anonymous: bool,
    /// 目标应用
    #[serde(default)]
    pub app: UpiApp,
}

/// UPI链接生成响应
#[derive(Debug, Serialize)]
pub struct UpiLinkResponse {
    /// 交易参考号
    pub transaction_ref: String,
    /// 指定应用的深度链接
    pub payment_url: String,
    /// 通用二维码 (Base64编码的PNG图片)
    pub qr_code: String,
}

/// UPI应用信息
#[derive(Debug, Serialize)]
pub struct UpiAppInfo {
    pub id: UpiApp,
    pub name: &'static str,
}
