// ==========================================
// 创建波次测试
// ==========================================
// 覆盖: 待建实体转换失败时的文档 FAILED 短路,
//       前序波次新建 id 向批处理阶段的回灌
// ==========================================

mod test_helpers;

use commission_crm::domain::types::ProcessingStatus;
use commission_crm::executor::DocumentExecutor;
use serde_json::json;

#[tokio::test]
async fn test_missing_factory_mapping_fails_document() {
    let (_db, conn) = test_helpers::create_test_db();
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");

    let fragment = json!({
        "internal_uuid": "U1",
        "order_number": "PO-55",
        "details": [{"flow_index": 0, "quantity_ordered": 3, "unit_price": 20}]
    });
    let doc_id = test_helpers::seed_pending_document(
        &conn,
        910,
        Some("ORDERS"),
        &json!([fragment]),
    );
    // 客户已确认, 厂商映射缺失
    test_helpers::seed_pending_entity(
        &conn, doc_id, "CUSTOMERS", "CONFIRMED", Some(customer_id), &["U1"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "ORDERS", "SET_FOR_CREATION", None, &["U1"], None, Some(&fragment),
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    // 波次议题短路: 不落任何订单, 文档置 FAILED
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Error);
    assert_eq!(records[0].error_message.as_deref(), Some("缺少厂商映射"));
    assert_eq!(test_helpers::count_rows(&conn, "sales_order"), 0);
    assert_eq!(test_helpers::count_rows(&conn, "processing_record"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "entity_link"), 0);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "FAILED");
}

#[tokio::test]
async fn test_wave_created_order_feeds_invoice_batch() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");

    // 发票文档, 其订单对手方同批待建
    let order_fragment = json!({
        "internal_uuid": "U1",
        "order_number": "PO-77",
        "details": [{
            "flow_index": 0,
            "item_number": 1,
            "factory_part_number": "ABC-123",
            "quantity_ordered": 5,
            "unit_price": 10
        }]
    });
    let doc_id = test_helpers::seed_pending_document(
        &conn,
        911,
        Some("INVOICES"),
        &json!([{
            "internal_uuid": "U1",
            "invoice_number": "INV-1",
            "details": [{
                "flow_detail_index": 0,
                "item_number": 1,
                "factory_part_number": "ABC-123",
                "quantity_shipped": 4,
                "unit_price": 10
            }]
        }]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "FACTORIES", "CONFIRMED", Some(factory_id), &["U1"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "CUSTOMERS", "CONFIRMED", Some(customer_id), &["U1"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "ORDERS", "SET_FOR_CREATION", None, &["U1"], None, Some(&order_fragment),
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    // 订单在波次中创建, 发票在批处理中创建并回挂到新订单行
    assert_eq!(test_helpers::count_rows(&conn, "sales_order"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "invoice"), 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Created);

    let order_detail_id = test_helpers::query_i64(&conn, "SELECT id FROM order_detail");
    assert_eq!(
        test_helpers::query_i64(&conn, "SELECT order_detail_id FROM invoice_detail"),
        order_detail_id
    );

    // 文件链接只指向文档自身类型（发票）
    assert_eq!(test_helpers::count_rows(&conn, "entity_link"), 1);
    assert_eq!(
        test_helpers::query_text(&conn, "SELECT target_type FROM entity_link"),
        "INVOICE"
    );
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}
