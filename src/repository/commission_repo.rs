// ==========================================
// 销售佣金 CRM - 佣金结算仓储
// ==========================================
// 聚合: 贷项 / 调整 / 佣金结算单 / 支票
// ==========================================

use crate::domain::commission::{AdjustmentInput, CheckInput, CreditInput, StatementInput};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{date_opt_to_sql, dec_opt_to_sql, dec_to_sql};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct CommissionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CommissionRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 贷项
    // ==========================================
    pub fn create_credit_in_tx(conn: &Connection, input: &CreditInput) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO credit (credit_number, factory_id, order_id, credit_date, credit_amount)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input.credit_number,
                input.factory_id,
                input.order_id,
                date_opt_to_sql(input.credit_date),
                dec_to_sql(input.credit_amount),
            ],
        )?;
        let credit_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO credit_detail (credit_id, order_detail_id, quantity, unit_price, commission_rate)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for detail in &input.details {
            stmt.execute(params![
                credit_id,
                detail.order_detail_id,
                dec_to_sql(detail.quantity),
                dec_to_sql(detail.unit_price),
                dec_opt_to_sql(detail.commission_rate),
            ])?;
        }
        Ok(credit_id)
    }

    pub fn create_credit(&self, input: &CreditInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let id = Self::create_credit_in_tx(&tx, input)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn find_credit_by_number_and_factory(
        &self,
        credit_number: &str,
        factory_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM credit WHERE credit_number = ?1 AND factory_id = ?2",
                params![credit_number, factory_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 调整
    // ==========================================
    pub fn create_adjustment_in_tx(
        conn: &Connection,
        input: &AdjustmentInput,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO adjustment (
                adjustment_number, factory_id, customer_id, amount, reason,
                adjustment_date, allocation_method
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                input.adjustment_number,
                input.factory_id,
                input.customer_id,
                dec_to_sql(input.amount),
                input.reason,
                date_opt_to_sql(input.adjustment_date),
                input.allocation_method.to_db_str(),
            ],
        )?;
        let adjustment_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            "INSERT INTO adjustment_split (adjustment_id, user_id, percentage) VALUES (?1, ?2, ?3)",
        )?;
        for (user_id, percentage) in &input.splits {
            stmt.execute(params![adjustment_id, user_id, dec_to_sql(*percentage)])?;
        }
        Ok(adjustment_id)
    }

    pub fn create_adjustment(&self, input: &AdjustmentInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let id = Self::create_adjustment_in_tx(&tx, input)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn find_adjustment_by_number_and_factory(
        &self,
        adjustment_number: &str,
        factory_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM adjustment WHERE adjustment_number = ?1 AND factory_id = ?2",
                params![adjustment_number, factory_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 佣金结算单
    // ==========================================
    pub fn create_statement(&self, input: &StatementInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let statement_id = {
            tx.execute(
                r#"
                INSERT INTO commission_statement (statement_number, factory_id, statement_date)
                VALUES (?1, ?2, ?3)
                "#,
                params![
                    input.statement_number,
                    input.factory_id,
                    date_opt_to_sql(input.statement_date),
                ],
            )?;
            let statement_id = tx.last_insert_rowid();

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO statement_detail (
                    statement_id, invoice_id, order_detail_id, quantity,
                    unit_price, commission_rate, commission_amount
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for detail in &input.details {
                stmt.execute(params![
                    statement_id,
                    detail.invoice_id,
                    detail.order_detail_id,
                    dec_to_sql(detail.quantity),
                    dec_to_sql(detail.unit_price),
                    dec_opt_to_sql(detail.commission_rate),
                    dec_opt_to_sql(detail.commission_amount),
                ])?;
            }
            statement_id
        };
        tx.commit()?;
        Ok(statement_id)
    }

    pub fn find_statement_by_number(
        &self,
        statement_number: &str,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM commission_statement WHERE statement_number = ?1",
                params![statement_number],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 支票
    // ==========================================
    pub fn create_check(&self, input: &CheckInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let check_id = {
            tx.execute(
                r#"
                INSERT INTO payment_check (check_number, factory_id, check_date, check_amount)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    input.check_number,
                    input.factory_id,
                    date_opt_to_sql(input.check_date),
                    dec_to_sql(input.check_amount),
                ],
            )?;
            let check_id = tx.last_insert_rowid();

            let mut stmt = tx.prepare(
                "INSERT INTO check_detail (check_id, invoice_id, paid_amount) VALUES (?1, ?2, ?3)",
            )?;
            for detail in &input.details {
                stmt.execute(params![
                    check_id,
                    detail.invoice_id,
                    dec_to_sql(detail.paid_amount),
                ])?;
            }
            check_id
        };
        tx.commit()?;
        Ok(check_id)
    }

    pub fn find_check_by_number_and_factory(
        &self,
        check_number: &str,
        factory_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM payment_check WHERE check_number = ?1 AND factory_id = ?2",
                params![check_number, factory_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}
