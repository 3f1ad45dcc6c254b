// ==========================================
// 文档执行器端到端测试
// ==========================================
// 覆盖: 确认映射的订单文档、行跳过的发票文档、
//       发票片段分组（同一发票拆在多行时只建一张）
// ==========================================

mod test_helpers;

use commission_crm::domain::types::ProcessingStatus;
use commission_crm::executor::DocumentExecutor;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_order_document_with_confirmed_mappings() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", Some("5"));
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");
    let product_id = test_helpers::seed_product(&conn, Some(factory_id), "Widget", Some("ABC-123"));
    let end_user_id = test_helpers::seed_end_user(&conn, "Plant 9");

    let doc_id = test_helpers::seed_pending_document(
        &conn,
        900,
        Some("ORDERS"),
        &json!([{
            "internal_uuid": "U1",
            "order_number": "PO-1001",
            "details": [{
                "flow_index": 0,
                "item_number": 1,
                "factory_part_number": "ABC-123",
                "quantity_ordered": 5,
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
        &conn, doc_id, "PRODUCTS", "CONFIRMED", Some(product_id), &["U1"], Some(0), None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "END_USERS", "CONFIRMED", Some(end_user_id), &["U1"], Some(0), None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Created);
    let order_id = records[0].entity_id.expect("created record carries entity id");

    assert_eq!(test_helpers::count_rows(&conn, "sales_order"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "order_detail"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "processing_record"), 1);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");

    // 文件 → 订单链接
    assert_eq!(test_helpers::count_rows(&conn, "entity_link"), 1);
    assert_eq!(
        test_helpers::query_i64(
            &conn,
            "SELECT target_id FROM entity_link WHERE source_type = 'FILE' AND target_type = 'ORDER'",
        ),
        order_id
    );
    assert_eq!(
        test_helpers::query_i64(&conn, "SELECT source_id FROM entity_link"),
        900
    );

    // 行级映射落到订单明细
    assert_eq!(
        test_helpers::query_i64(&conn, "SELECT product_id FROM order_detail"),
        product_id
    );
    assert_eq!(
        test_helpers::query_i64(&conn, "SELECT end_user_id FROM order_detail"),
        end_user_id
    );
}

#[tokio::test]
async fn test_invoice_document_with_skipped_line_recomputes_amount() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");

    let doc_id = test_helpers::seed_pending_document(
        &conn,
        901,
        Some("INVOICES"),
        &json!([{
            "internal_uuid": "U1",
            "invoice_number": "INV-9",
            "invoice_amount": 150,
            "details": [
                {"flow_detail_index": 0, "quantity_shipped": 1, "unit_price": 100},
                {"flow_detail_index": 1, "quantity_shipped": 1, "unit_price": 50}
            ]
        }]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "FACTORIES", "CONFIRMED", Some(factory_id), &["U1"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "CUSTOMERS", "CONFIRMED", Some(customer_id), &["U1"], None, None,
    );
    // 第二行的产品被用户跳过
    test_helpers::seed_pending_entity(
        &conn, doc_id, "PRODUCTS", "SKIPPED", None, &["U1"], Some(1), None,
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Created);
    assert_eq!(test_helpers::count_rows(&conn, "invoice"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "invoice_detail"), 1);

    // 有行被过滤, 金额按存活行重算而不是沿用 DTO 金额
    let amount: Decimal = test_helpers::query_text(&conn, "SELECT invoice_amount FROM invoice")
        .parse()
        .expect("decimal amount");
    assert_eq!(amount, dec!(100));
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}

#[tokio::test]
async fn test_invoice_fragments_set_for_creation_merge_into_one() {
    let (_db, conn) = test_helpers::create_test_db();
    let factory_id = test_helpers::seed_factory(&conn, "Cooper Industries", None);
    let customer_id = test_helpers::seed_customer(&conn, "Acme Corp");

    let fragment_a = json!({
        "internal_uuid": "U1",
        "invoice_number": "INV-7",
        "invoice_amount": 100,
        "factory": {"name": "Cooper"},
        "details": [{"flow_detail_index": 0, "quantity_shipped": 1, "unit_price": 100}]
    });
    let fragment_b = json!({
        "internal_uuid": "U2",
        "invoice_number": "INV-7",
        "invoice_amount": 100,
        "factory": {"name": " cooper "},
        "details": [{"flow_detail_index": 1, "quantity_shipped": 1, "unit_price": 100}]
    });

    let doc_id = test_helpers::seed_pending_document(
        &conn,
        902,
        Some("INVOICES"),
        &json!([fragment_a, fragment_b]),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "FACTORIES", "CONFIRMED", Some(factory_id), &["U1", "U2"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "CUSTOMERS", "CONFIRMED", Some(customer_id), &["U1", "U2"], None, None,
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "INVOICES", "SET_FOR_CREATION", None, &["U1"], None, Some(&fragment_a),
    );
    test_helpers::seed_pending_entity(
        &conn, doc_id, "INVOICES", "SET_FOR_CREATION", None, &["U2"], None, Some(&fragment_b),
    );

    let executor = DocumentExecutor::new(conn.clone(), test_helpers::default_settings());
    let records = executor.execute(doc_id).await.expect("execute");

    // 两个片段合并为一张发票, 波次只产出一条 CREATED 记录
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Created);
    assert_eq!(test_helpers::count_rows(&conn, "invoice"), 1);
    assert_eq!(test_helpers::count_rows(&conn, "invoice_detail"), 2);

    // 金额为片段金额之和
    let amount: Decimal = test_helpers::query_text(&conn, "SELECT invoice_amount FROM invoice")
        .parse()
        .expect("decimal amount");
    assert_eq!(amount, dec!(200));

    // 波次消费了两个 DTO, 批处理器不再重复创建
    assert_eq!(test_helpers::count_rows(&conn, "entity_link"), 1);
    assert_eq!(test_helpers::workflow_status(&conn, doc_id), "COMPLETED");
}
