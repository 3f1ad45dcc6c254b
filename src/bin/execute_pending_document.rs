// ==========================================
// 销售佣金 CRM - 文档执行驱动器
// ==========================================
// 用法: execute_pending_document <db_path> <document_id>
// 对单个待处理文档跑一次执行, 打印处理记录摘要
// ==========================================

use anyhow::{bail, Context, Result};
use commission_crm::config::ConfigManager;
use commission_crm::domain::types::ProcessingStatus;
use commission_crm::executor::DocumentExecutor;
use commission_crm::{db, logging};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("用法: {} <db_path> <document_id>", args[0]);
    }
    let db_path = &args[1];
    let document_id: i64 = args[2]
        .parse()
        .with_context(|| format!("无效的文档 id: {}", args[2]))?;

    let conn = db::open_sqlite_connection(db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    db::init_schema(&conn).context("schema 初始化失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())
        .map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {}", e))?;
    let executor = DocumentExecutor::from_config(conn, &config)
        .await
        .map_err(|e| anyhow::anyhow!("执行器构建失败: {}", e))?;

    let records = executor
        .execute(document_id)
        .await
        .map_err(|e| anyhow::anyhow!("文档执行失败: {}", e))?;

    let created = records
        .iter()
        .filter(|r| r.status == ProcessingStatus::Created)
        .count();
    let skipped = records
        .iter()
        .filter(|r| r.status == ProcessingStatus::Skipped)
        .count();
    let errors = records
        .iter()
        .filter(|r| r.status == ProcessingStatus::Error)
        .count();

    println!(
        "文档 {} 执行完成: {} 条记录 (CREATED={}, SKIPPED={}, ERROR={})",
        document_id,
        records.len(),
        created,
        skipped,
        errors
    );
    for record in &records {
        println!(
            "  [{}] entity_id={:?} {}",
            record.status,
            record.entity_id,
            record.error_message.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
