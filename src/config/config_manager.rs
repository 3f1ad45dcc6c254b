// ==========================================
// 销售佣金 CRM - 配置管理器
// ==========================================
// 职责: 配置加载、查询
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::execution_config_trait::ExecutionConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT, 测试与运维脚本用）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

// ==========================================
// ExecutionConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ExecutionConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::BATCH_SIZE, "50")?;
        let parsed = value.parse::<usize>().unwrap_or(50);
        // 批大小为 0 会让批处理器空转
        Ok(if parsed == 0 { 50 } else { parsed })
    }

    async fn get_fuzzy_match_threshold(&self) -> Result<u8, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::FUZZY_MATCH_THRESHOLD, "88")?;
        Ok(value.parse::<u8>().unwrap_or(88).min(100))
    }

    async fn get_price_tolerance(&self) -> Result<Decimal, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::PRICE_TOLERANCE, "0.10")?;
        Ok(Decimal::from_str(value.trim()).unwrap_or_else(|_| Decimal::new(10, 2)))
    }

    async fn get_acting_user_id(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::ACTING_USER_ID, "1")?;
        Ok(value.parse::<i64>().unwrap_or(1))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批处理
    pub const BATCH_SIZE: &str = "batch_size";

    // 模糊行匹配
    pub const FUZZY_MATCH_THRESHOLD: &str = "fuzzy_match_threshold";
    pub const PRICE_TOLERANCE: &str = "price_tolerance";

    // 操作用户
    pub const ACTING_USER_ID: &str = "acting_user_id";
}
