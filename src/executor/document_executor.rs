// ==========================================
// 销售佣金 CRM - 文档执行器
// ==========================================
// 编排: 加载 → 映射折叠 → DTO 加载 → 创建波次 →
//       批处理 → 文件链接 → 状态落盘
// 错误边界: entity_type 未设置与文档不存在直接抛出;
//           其余意外错误捕获后在独立短事务置 FAILED 并返回空结果
// ==========================================

use crate::config::ExecutionConfigReader;
use crate::domain::mapping::EntityMapping;
use crate::domain::processing::ProcessingRecord;
use crate::domain::types::{DocumentEntityType, LinkSourceType, WorkflowStatus};
use crate::engine::detail_matcher::OrderDetailMatcher;
use crate::executor::auto_number::SequenceAutoNumberService;
use crate::executor::batch_processor;
use crate::executor::converters::{
    AcknowledgementConverter, AdjustmentConverter, CheckConverter, CreditConverter,
    CustomerConverter, DeliveryConverter, DtoConverter, FactoryConverter, InvoiceConverter,
    OrderConverter, ProductConverter, QuoteConverter, StatementConverter,
};
use crate::executor::creation_handler::CreationHandler;
use crate::executor::dto_loader;
use crate::executor::error::{ExecutionError, ExecutionResult};
use crate::executor::mapping_resolver::resolve_entity_mappings;
use crate::repository::link_repo::EntityLinkRepository;
use crate::repository::pending_document_repo::PendingDocumentRepository;
use crate::repository::processing_record_repo::ProcessingRecordRepository;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// ExecutionSettings - 一次执行的策略旋钮
// ==========================================
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub batch_size: usize,
    pub fuzzy_match_threshold: u8,
    pub price_tolerance: Decimal,
    pub acting_user_id: i64,
}

impl ExecutionSettings {
    /// 从配置读取接口加载全部旋钮
    pub async fn load(config: &dyn ExecutionConfigReader) -> ExecutionResult<Self> {
        Ok(Self {
            batch_size: config.get_batch_size().await.map_err(config_error)?,
            fuzzy_match_threshold: config
                .get_fuzzy_match_threshold()
                .await
                .map_err(config_error)?,
            price_tolerance: config.get_price_tolerance().await.map_err(config_error)?,
            acting_user_id: config.get_acting_user_id().await.map_err(config_error)?,
        })
    }
}

fn config_error(e: Box<dyn std::error::Error>) -> ExecutionError {
    ExecutionError::Config(e.to_string())
}

// ==========================================
// DocumentExecutor
// ==========================================
pub struct DocumentExecutor {
    conn: Arc<Mutex<Connection>>,
    document_repo: PendingDocumentRepository,
    record_repo: ProcessingRecordRepository,
    link_repo: EntityLinkRepository,
    settings: ExecutionSettings,
}

impl DocumentExecutor {
    pub fn new(conn: Arc<Mutex<Connection>>, settings: ExecutionSettings) -> Self {
        Self {
            document_repo: PendingDocumentRepository::from_connection(conn.clone()),
            record_repo: ProcessingRecordRepository::from_connection(conn.clone()),
            link_repo: EntityLinkRepository::from_connection(conn.clone()),
            conn,
            settings,
        }
    }

    /// 从配置读取接口构建执行器
    pub async fn from_config(
        conn: Arc<Mutex<Connection>>,
        config: &dyn ExecutionConfigReader,
    ) -> ExecutionResult<Self> {
        let settings = ExecutionSettings::load(config).await?;
        Ok(Self::new(conn, settings))
    }

    /// 执行单个待处理文档
    ///
    /// # 返回
    /// - Ok(records): 本次执行产出的全部处理记录（FAILED 短路时为议题的 ERROR 记录,
    ///   意外错误兜底时为空）
    /// - Err: 仅 entity_type 未设置或文档不存在
    #[instrument(skip(self))]
    pub async fn execute(&self, document_id: i64) -> ExecutionResult<Vec<ProcessingRecord>> {
        match self.execute_inner(document_id).await {
            Ok(records) => Ok(records),
            Err(e @ (ExecutionError::EntityTypeNotSet | ExecutionError::DocumentNotFound { .. })) => {
                Err(e)
            }
            Err(e) => {
                error!(document_id, error = %e, "文档执行意外失败, 独立事务置 FAILED");
                if let Err(mark_err) = self.document_repo.mark_failed_transient(document_id) {
                    error!(document_id, error = %mark_err, "FAILED 状态落盘失败");
                }
                Ok(Vec::new())
            }
        }
    }

    async fn execute_inner(&self, document_id: i64) -> ExecutionResult<Vec<ProcessingRecord>> {
        // 步骤 1-2: 加载文档与用户决策, 校验实体类型
        let document = self
            .document_repo
            .load_with_entities(document_id)?
            .ok_or(ExecutionError::DocumentNotFound { id: document_id })?;
        let entity_type = document.entity_type.ok_or(ExecutionError::EntityTypeNotSet)?;

        info!(
            document_id,
            entity_type = %entity_type,
            pending_entity_count = document.pending_entities.len(),
            "开始执行待处理文档"
        );

        // 步骤 3: 决策折叠为逐 DTO 映射
        let mut mappings = resolve_entity_mappings(&document.pending_entities);

        // 步骤 4: 加载提取数据行
        let rows = dto_loader::load_rows(&document.extracted_data_json)?;

        // 步骤 5: SET_FOR_CREATION 创建波次
        let handler = CreationHandler::new(
            self.conn.clone(),
            self.settings.fuzzy_match_threshold,
            self.settings.price_tolerance,
            self.settings.acting_user_id,
        );
        let creation = handler.run_waves(&document, &mut mappings).await?;

        if creation.has_issues() {
            warn!(
                document_id,
                issue_count = creation.issues.len(),
                "创建波次存在议题, 文档置 FAILED 并跳过批处理"
            );
            let records: Vec<ProcessingRecord> = creation
                .issues
                .iter()
                .map(|issue| {
                    ProcessingRecord::error(
                        document.id,
                        issue.dto_json.clone().unwrap_or_default(),
                        issue.error_message.clone(),
                    )
                })
                .collect();
            self.record_repo.batch_insert(&records)?;
            self.document_repo
                .update_workflow_status(document.id, WorkflowStatus::Failed)?;
            return Ok(records);
        }

        // 步骤 6: 批处理（波次已消费的 DTO 剔除）
        let consumed: HashSet<String> = creation.consumed_dto_ids.iter().cloned().collect();
        let mut records = creation.wave_records.clone();
        let mut created_ids = creation.wave_entity_ids.clone();

        let (batch_records, batch_ids) = self
            .dispatch_batch(entity_type, &rows, &mappings, &consumed, document.id)
            .await?;
        records.extend(batch_records);
        created_ids.extend(batch_ids);

        // 步骤 7: 文件链接（无映射的类型记日志跳过）
        match entity_type.link_target() {
            Some(target) => {
                let linked = self.link_repo.bulk_create_links(
                    LinkSourceType::File,
                    document.file_id,
                    target,
                    &created_ids,
                )?;
                debug!(document_id, linked, target = %target, "文件链接建立完成");
            }
            None => debug!(document_id, entity_type = %entity_type, "该实体类型不建立文件链接"),
        }

        // 步骤 8: 记录与状态落盘
        self.record_repo.batch_insert(&records)?;
        self.document_repo
            .update_workflow_status(document.id, WorkflowStatus::Completed)?;

        info!(
            document_id,
            record_count = records.len(),
            created_count = created_ids.len(),
            "文档执行完成"
        );
        Ok(records)
    }

    /// 按文档实体类型分发到对应转换器
    async fn dispatch_batch(
        &self,
        entity_type: DocumentEntityType,
        rows: &[serde_json::Value],
        mappings: &HashMap<String, EntityMapping>,
        consumed: &HashSet<String>,
        document_id: i64,
    ) -> ExecutionResult<(Vec<ProcessingRecord>, Vec<i64>)> {
        let conn = self.conn.clone();
        match entity_type {
            DocumentEntityType::Orders => {
                let converter = OrderConverter::new(conn, self.auto_number());
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Invoices => {
                let converter = InvoiceConverter::new(conn, self.matcher(), self.auto_number());
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Checks => {
                let converter = CheckConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Credits => {
                let converter = CreditConverter::new(conn, self.matcher());
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Adjustments => {
                let converter = AdjustmentConverter::new(conn, self.settings.acting_user_id);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Quotes => {
                let converter = QuoteConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Customers => {
                let converter = CustomerConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Factories => {
                let converter = FactoryConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Products => {
                let converter = ProductConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::OrderAcknowledgements => {
                let converter = AcknowledgementConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::CommissionStatements => {
                let converter = StatementConverter::new(conn, self.matcher());
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
            DocumentEntityType::Deliveries => {
                let converter = DeliveryConverter::new(conn);
                self.run_batch(converter, rows, mappings, consumed, document_id)
                    .await
            }
        }
    }

    /// 解析 → 剔除波次已消费 DTO → 批处理; 返回记录与新建实体 id
    async fn run_batch<C: DtoConverter>(
        &self,
        mut converter: C,
        rows: &[serde_json::Value],
        mappings: &HashMap<String, EntityMapping>,
        consumed: &HashSet<String>,
        document_id: i64,
    ) -> ExecutionResult<(Vec<ProcessingRecord>, Vec<i64>)> {
        let dtos: Vec<C::Dto> = converter
            .parse_dtos(rows)?
            .into_iter()
            .filter(|dto| !consumed.contains(converter.internal_uuid(dto)))
            .collect();

        let mut created_ids = Vec::new();
        let records = {
            let mut on_created = |id: i64| created_ids.push(id);
            batch_processor::process_dtos(
                &mut converter,
                &dtos,
                mappings,
                document_id,
                self.settings.batch_size,
                &mut on_created,
            )
            .await?
        };
        Ok((records, created_ids))
    }

    fn matcher(&self) -> OrderDetailMatcher {
        OrderDetailMatcher::new(
            self.settings.fuzzy_match_threshold,
            self.settings.price_tolerance,
        )
    }

    fn auto_number(&self) -> Box<SequenceAutoNumberService> {
        Box::new(SequenceAutoNumberService::from_connection(self.conn.clone()))
    }
}
