// 捐赠记录服务
// 负责已验证回调的持久化、按交易号查询以及已完成捐赠的汇总

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::DatabaseConfig;
use crate::models::{DonationRecord, DonationStatus, SaveResult};

/// 捐赠记录存储
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// 保存回调结果
    ///
    /// 同一交易号只记录一次；处理中的记录可以被最终状态覆盖，其余重复回调被忽略
    async fn save_outcome(&self, record: DonationRecord) -> Result<SaveResult>;

    /// 根据交易号查询
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<DonationRecord>>;

    /// 已完成捐赠总额
    async fn total_completed_amount(&self) -> Result<Decimal>;

    /// 存储连通性检查
    async fn ping(&self) -> Result<()>;

    /// 存储类型名称
    fn backend(&self) -> &'static str;
}

/// 判断已有记录是否允许被新结果覆盖
fn accepts_update(existing: DonationStatus, incoming: DonationStatus) -> bool {
    existing == DonationStatus::Pending && incoming != DonationStatus::Pending
}

/// PostgreSQL 存储
pub struct PgDonationRepository {
    pool: PgPool,
}

impl PgDonationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 建立连接池并执行数据库迁移
    ///
    /// # Arguments
    /// * `url` - 数据库连接URL
    /// * `config` - 数据库配置
    ///
    /// # Returns
    /// * 可用的存储实例
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        log::info!(
            "Database ready (max_connections={})",
            config.max_connections
        );

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DonationRepository for PgDonationRepository {
    async fn save_outcome(&self, record: DonationRecord) -> Result<SaveResult> {
        // xmax = 0 表示本次为插入
        let inserted: Option<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO donations (
                id, transaction_id, amount, donor_name, donor_email, donor_phone,
                donation_type, purpose, beneficiary, status, gateway_payment_id,
                payment_method, payment_mode, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            ON CONFLICT (transaction_id) DO UPDATE
            SET status = EXCLUDED.status,
                gateway_payment_id = EXCLUDED.gateway_payment_id,
                payment_mode = EXCLUDED.payment_mode,
                updated_at = NOW()
            WHERE donations.status = 'pending' AND EXCLUDED.status <> 'pending'
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(record.id)
        .bind(&record.transaction_id)
        .bind(record.amount)
        .bind(&record.donor_name)
        .bind(&record.donor_email)
        .bind(&record.donor_phone)
        .bind(&record.donation_type)
        .bind(&record.purpose)
        .bind(&record.beneficiary)
        .bind(record.status)
        .bind(&record.gateway_payment_id)
        .bind(&record.payment_method)
        .bind(&record.payment_mode)
        .bind(record.created_at)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to save donation {}", record.transaction_id))?;

        Ok(match inserted {
            Some(true) => SaveResult::Inserted,
            Some(false) => SaveResult::Updated,
            None => SaveResult::Duplicate,
        })
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<DonationRecord>> {
        sqlx::query_as::<_, DonationRecord>(
            r#"
            SELECT id, transaction_id, amount, donor_name, donor_email, donor_phone,
                   donation_type, purpose, beneficiary, status, gateway_payment_id,
                   payment_method, payment_mode, created_at, updated_at
            FROM donations
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch donation")
    }

    async fn total_completed_amount(&self) -> Result<Decimal> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM donations WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum completed donations")
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// 内存存储 (未配置数据库时使用，进程重启后数据丢失)
#[derive(Default)]
pub struct InMemoryDonationRepository {
    records: RwLock<HashMap<String, DonationRecord>>,
}

impl InMemoryDonationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DonationRepository for InMemoryDonationRepository {
    async fn save_outcome(&self, record: DonationRecord) -> Result<SaveResult> {
        let mut records = self.records.write().await;

        match records.get_mut(&record.transaction_id) {
            None => {
                records.insert(record.transaction_id.clone(), record);
                Ok(SaveResult::Inserted)
            }
            Some(existing) if accepts_update(existing.status, record.status) => {
                existing.status = record.status;
                existing.gateway_payment_id = record.gateway_payment_id;
                existing.payment_mode = record.payment_mode;
                existing.updated_at = chrono::Utc::now();
                Ok(SaveResult::Updated)
            }
            Some(_) => Ok(SaveResult::Duplicate),
        }
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<DonationRecord>> {
        Ok(self.records.read().await.get(transaction_id).cloned())
    }

    async fn total_completed_amount(&self) -> Result<Decimal> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.is_completed())
            .map(|record| record.amount)
            .sum())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
