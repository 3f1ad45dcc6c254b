// ==========================================
// 销售佣金 CRM - 主数据仓储
// ==========================================
// 聚合: 厂商 / 客户 / 最终用户 / 产品 / 计量单位 / 仓库
// 静态 *_in_tx 方法供保存点波次在外层事务内复用
// ==========================================

use crate::domain::catalog::{Customer, CustomerInput, Factory, FactoryInput, ProductInput};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{dec_opt_from_sql, dec_opt_to_sql};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 厂商
    // ==========================================
    pub fn create_factory_in_tx(conn: &Connection, input: &FactoryInput) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO factory (
                name, default_commission_rate, default_commission_discount_rate,
                default_product_discount_rate
            ) VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                input.name,
                dec_opt_to_sql(input.default_commission_rate),
                dec_opt_to_sql(input.default_commission_discount_rate),
                dec_opt_to_sql(input.default_product_discount_rate),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_factory(&self, input: &FactoryInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::create_factory_in_tx(&conn, input)
    }

    /// 加载厂商（转换器费率缺省回退的来源）
    pub fn find_factory(&self, id: i64) -> RepositoryResult<Option<Factory>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT id, name, default_commission_rate, default_commission_discount_rate,
                       default_product_discount_rate
                FROM factory
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, name, rate, discount_rate, product_discount)) = row else {
            return Ok(None);
        };
        Ok(Some(Factory {
            id,
            name,
            default_commission_rate: dec_opt_from_sql(rate)?,
            default_commission_discount_rate: dec_opt_from_sql(discount_rate)?,
            default_product_discount_rate: dec_opt_from_sql(product_discount)?,
        }))
    }

    // ==========================================
    // 客户
    // ==========================================
    pub fn create_customer_in_tx(
        conn: &Connection,
        input: &CustomerInput,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO customer (
                company_name, contact_name, email, phone, address, city, state, zip_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                input.company_name,
                input.contact_name,
                input.email,
                input.phone,
                input.address,
                input.city,
                input.state,
                input.zip_code,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_customer(&self, input: &CustomerInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::create_customer_in_tx(&conn, input)
    }

    /// 按公司名查找客户（大小写不敏感, 与唯一约束一致）
    pub fn find_customer_by_company_name(&self, name: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.get_conn()?;
        Self::find_customer_by_company_name_in_tx(&conn, name)
    }

    pub fn find_customer_by_company_name_in_tx(
        conn: &Connection,
        name: &str,
    ) -> RepositoryResult<Option<Customer>> {
        let row = conn
            .query_row(
                r#"
                SELECT id, company_name, contact_name, email, phone, address, city, state, zip_code
                FROM customer
                WHERE company_name = ?1 COLLATE NOCASE
                "#,
                params![name.trim()],
                |row| {
                    Ok(Customer {
                        id: row.get(0)?,
                        company_name: row.get(1)?,
                        contact_name: row.get(2)?,
                        email: row.get(3)?,
                        phone: row.get(4)?,
                        address: row.get(5)?,
                        city: row.get(6)?,
                        state: row.get(7)?,
                        zip_code: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ==========================================
    // 最终用户
    // ==========================================
    pub fn create_end_user_in_tx(conn: &Connection, name: &str) -> RepositoryResult<i64> {
        conn.execute("INSERT INTO end_user (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_end_user(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::create_end_user_in_tx(&conn, name)
    }

    // ==========================================
    // 产品
    // ==========================================
    pub fn create_product_in_tx(conn: &Connection, input: &ProductInput) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO product (
                name, factory_id, factory_part_number, description, uom_id,
                unit_price, commission_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                input.name,
                input.factory_id,
                input.factory_part_number,
                input.description,
                input.uom_id,
                dec_opt_to_sql(input.unit_price),
                dec_opt_to_sql(input.commission_rate),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_product(&self, input: &ProductInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::create_product_in_tx(&conn, input)
    }

    /// 按 (厂商, 件号) 查找产品 id
    pub fn find_product_by_part_number(
        &self,
        factory_id: i64,
        part_number: &str,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                r#"
                SELECT id FROM product
                WHERE factory_id = ?1 AND factory_part_number = ?2 COLLATE NOCASE
                "#,
                params![factory_id, part_number.trim()],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 计量单位 / 仓库
    // ==========================================
    /// 按标题解析计量单位, 不存在则创建
    pub fn resolve_uom_in_tx(conn: &Connection, title: &str) -> RepositoryResult<i64> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM uom WHERE title = ?1",
                params![title.trim()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute("INSERT INTO uom (title) VALUES (?1)", params![title.trim()])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn resolve_uom(&self, title: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::resolve_uom_in_tx(&conn, title)
    }

    /// 按名称查找仓库（大小写不敏感）
    pub fn find_warehouse_by_name(&self, name: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM warehouse WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?)
    }
}
