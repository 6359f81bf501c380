// 服务层模块
// 包含所有业务逻辑服务

pub mod donation_service;
pub mod notification_service;
pub mod payu_service;
pub mod upi_service;

// 重新导出服务
pub use donation_service::{DonationRepository, InMemoryDonationRepository, PgDonationRepository};
pub use notification_service::{DonationNotifier, EmailJsNotifier, LogNotifier};
pub use payu_service::{PayuClient, PayuError};
pub use upi_service::UpiService;
