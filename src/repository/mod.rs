// ==========================================
// 销售佣金 CRM - 仓储层
// ==========================================
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

pub mod catalog_repo;
pub mod commission_repo;
pub mod error;
pub mod fulfillment_repo;
pub mod invoice_repo;
pub mod link_repo;
pub mod order_repo;
pub mod pending_document_repo;
pub mod processing_record_repo;
pub mod sql_util;

pub use catalog_repo::CatalogRepository;
pub use commission_repo::CommissionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use fulfillment_repo::FulfillmentRepository;
pub use invoice_repo::InvoiceRepository;
pub use link_repo::EntityLinkRepository;
pub use order_repo::OrderRepository;
pub use pending_document_repo::PendingDocumentRepository;
pub use processing_record_repo::ProcessingRecordRepository;
