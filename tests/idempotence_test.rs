// ==========================================
// 重复执行幂等性测试
// ==========================================
// 覆盖: 支票与订单确认按自然键查重,
//       同一文档重复执行不产生重复实体
// ==========================================

mod test_helpers;

use commission_crm::domain::types::ProcessingStatus;
use commission_crm::executor::DocumentExecutor;
use serde_json::json;

#[tokio::test]
async fn test_check_rerun_is_skipped() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");
    test_helpers::seed_invoice(&conn, "INV-7", factory_id, customer_id, "100");

    let doc_id = test_helpers::seed_pending_document(
        &conn,
        930,
        Some("CHECKS"),
        &json!([{
            "internal_uuid": "U1",
            "check_number": "CHK-9",
            "details": [{"flow_detail_index": 0, "invoice_number": "INV-7", "paid_amount": 100}]
        }]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "FACTORIES", "CONFIRMED", Some(factory_id), &["U1"], None, None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());

    let first = executor.execute(doc_id).await.expect("first run");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, ProcessingStatus::Created);
    assert_eq!(test_helpers::count_rows(&conn, "payment_check"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "check_detail"), 1);

    // 重复执行: 自然键 (check_number, factory_id) 查重兜住
    let second = executor.execute(doc_id).await.expect("second run");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].status, ProcessingStatus::Skipped);
    assert_eq!(
        second[0].error_message.as_deref(),
        Some("Duplicate or could not be created")
    );
    assert_eq!(test_helpers::count_rows(&conn, "payment_check"), 1);
}

#[tokio::test]
async fn test_acknowledgement_rerun_is_skipped() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");
    let order_id = test_helpers::seed_order(&conn, "PO-1", factory_id, customer_id);
    test_helpers::seed_order_detail(&conn, order_id, 1, None, "5", "10", "5", "OPEN");

    let doc_id = test_helpers::seed_pending_document(
        &conn,
        931,
        Some("ORDER_ACKNOWLEDGEMENTS"),
        &json!([{
            "internal_uuid": "U1",
            "ack_number": "ACK-1",
            "details": [{"flow_index": 0, "item_number": 1}]
        }]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "ORDERS", "CONFIRMED", Some(order_id), &["U1"], None, None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());

    let first = executor.execute(doc_id).await.expect("first run");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, ProcessingStatus::Created);
    assert_eq!(test_helpers::count_rows(&conn, "order_acknowledgement"), 1);

    let second = executor.execute(doc_id).await.expect("second run");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].status, ProcessingStatus::Skipped);
    assert_eq!(test_helpers::count_rows(&conn, "order_acknowledgement"), 1);
}
