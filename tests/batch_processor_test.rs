// ==========================================
// 批处理器测试
// ==========================================
// 覆盖: 文档内去重、批大小不影响结果、用户跳过、
//       不可转换行折算为 ERROR 记录
// ==========================================

mod test_helpers;

use commission_crm::domain::types::ProcessingStatus;
use commission_crm::executor::DocumentExecutor;
use serde_json::json;

fn customer_rows() -> serde_json::Value {
    json!([
        {"internal_uuid": "U1", "company_name": "Acme Corp"},
        {"internal_uuid": "U2", "company_name": "acme corp"},
        {"internal_uuid": "U3", "company_name": "Beta LLC"}
    ])
}

#[tokio::test]
async fn test_duplicate_customers_collapse_to_one() {
    let (_db, conn) = test_helpers::create_test_db();
    let doc_id = test_helpers::seed_pending_document(&conn, 920, Some("CUSTOMERS"), &customer_rows());

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    // 记录按 DTO 位置序产出
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, ProcessingStatus::Created);
    assert_eq!(records[1].status, ProcessingStatus::Skipped);
    assert_eq!(
        records[1].error_message.as_deref(),
        Some("Duplicate or could not be created")
    );
    assert_eq!(records[2].status, ProcessingStatus::Created);

    assert_eq!(test_helpers::count_rows(&conn, "customer"), 2);
    assert_eq!(test_helpers::count_rows(&conn, "entity_link"), 2);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}

#[tokio::test]
async fn test_batch_size_does_not_change_outcome() {
    let (_db, conn) = test_helpers::create_test_db();
    let doc_id = test_helpers::seed_pending_document(&conn, 921, Some("CUSTOMERS"), &customer_rows());

    // batch_size = 1 时重复行落到不同分片, 由已存在查找兜住
    let mut settings = test_helpers::default_settings();
    settings.batch_size = 1;
    let executor = DocumentExecutor::new(conn.clone(), settings);
    let records = executor.execute(doc_id).await.expect("execute");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, ProcessingStatus::Created);
    assert_eq!(records[1].status, ProcessingStatus::Skipped);
    assert_eq!(records[2].status, ProcessingStatus::Created);
    assert_eq!(test_helpers::count_rows(&conn, "customer"), 2);
}

#[tokio::test]
async fn test_user_skipped_dto_produces_skipped_record() {
    let (_db, conn) = test_helpers::create_test_db();
    let doc_id = test_helpers::seed_pending_document(
        &conn,
        922,
        Some("ORDERS"),
        &json!([{
            "internal_uuid": "U1",
            "order_number": "PO-9",
            "details": [{"flow_index": 0, "quantity_ordered": 1, "unit_price": 5}]
        }]),
    );
    // 用户跳过整个订单 DTO: 不要求任何其他映射
    test_helpers::seed_pending_entity(
        &conn, doc_id, "ORDERS", "SKIPPED", None, &["U1"], None, None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Skipped);
    assert_eq!(records[0].error_message.as_deref(), Some("Skipped by user"));
    assert_eq!(test_helpers::count_rows(&conn, "sales_order"), 0);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}

#[tokio::test]
async fn test_not_convertible_dto_produces_error_record() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");

    // 映射齐备但没有任何明细行 → 转换产出 None
    let doc_id = test_helpers::seed_pending_document(
        &conn,
        923,
        Some("ORDERS"),
        &json!([{
            "internal_uuid": "U1",
            "order_number": "PO-10",
            "details": []
        }]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "FACTORIES", "CONFIRMED", Some(factory_id), &["U1"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "CUSTOMERS", "CONFIRMED", Some(customer_id), &["U1"], None, None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    // 批处理阶段的逐条失败不拖垮文档
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Error);
    assert_eq!(
        records[0].error_message.as_deref(),
        Some("Record could not be converted to input. Missing required fields?")
    );
    assert_eq!(test_helpers::count_rows(&conn, "sales_order"), 0);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}
