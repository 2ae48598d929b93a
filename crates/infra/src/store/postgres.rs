//! Postgres-backed stores.
//!
//! ## Locking
//!
//! Every stock mutation runs in one transaction that first bounds its lock waits
//! (`lock_timeout` / `statement_timeout`, transaction-local), then reads the
//! row(s) with `SELECT ... FOR UPDATE`, executes the domain command and writes
//! the result back. Two-row operations lock in `StockKey` order.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (lock / statement timeout, deadlock, serialization) | `55P03`, `57014`, `40P01`, `40001` | `Transient` |
//! | PoolTimedOut / Io / PoolClosed | N/A | `Transient` |
//! | Anything else | Any other | `Backend` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument};

use stockledger_core::{AlertId, DomainError, OrderId, ProductId, TenantId, WarehouseId};
use stockledger_inventory::{
    AlertType, LedgerEntry, Severity, StockAlert, StockChange, StockCommand, StockError, StockKey,
    StockRecord, Transfer, Warehouse,
};

use super::{AlertStore, OnMissing, StockStore, StoreError, WarehouseStore};
use crate::config::StoreConfig;

const SCHEMA: &str = include_str!("../../migrations/0001_stock_ledger.sql");

const STOCK_COLUMNS: &str = "tenant_id, warehouse_id, product_id, quantity, reserved, damaged, \
                             reorder_level, updated_at";

/// Open a connection pool sized and bounded by `config`.
pub async fn connect(config: &StoreConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.lock_timeout())
        .connect(&config.database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create tables and indexes if they do not exist.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    info!("stock ledger schema ready");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Start a transaction whose lock waits and statements are bounded.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let timeout = format!("{}ms", self.lock_timeout.as_millis());
        sqlx::query("SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $1, true)")
            .bind(&timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_timeouts", e))?;

        Ok(tx)
    }

    async fn lock_entry(
        tx: &mut Transaction<'static, Postgres>,
        key: &StockKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stock \
             WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3 FOR UPDATE"
        );
        let Some(row) = sqlx::query(&sql)
            .bind(key.tenant_id.as_str())
            .bind(key.warehouse_id.as_str())
            .bind(key.product_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("lock_stock", e))?
        else {
            return Ok(None);
        };
        let record = stock_from_row(&row)?;

        let hold_rows = sqlx::query(
            r#"
            SELECT order_id, quantity
            FROM stock_reservations
            WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3
            "#,
        )
        .bind(key.tenant_id.as_str())
        .bind(key.warehouse_id.as_str())
        .bind(key.product_id.as_str())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_holds", e))?;

        let mut holds = Vec::with_capacity(hold_rows.len());
        for row in hold_rows {
            let order_id: OrderId = id_column(&row, "order_id")?;
            let units: i64 = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("decode_hold", e))?;
            holds.push((order_id, units));
        }

        Ok(Some(LedgerEntry::restore(record, holds)?))
    }

    /// Insert an empty row; a concurrent insert of the same key is not an error.
    async fn insert_empty(
        tx: &mut Transaction<'static, Postgres>,
        key: &StockKey,
        reorder_level: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO warehouse_stock (tenant_id, warehouse_id, product_id, reorder_level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, warehouse_id, product_id) DO NOTHING
            "#,
        )
        .bind(key.tenant_id.as_str())
        .bind(key.warehouse_id.as_str())
        .bind(key.product_id.as_str())
        .bind(reorder_level.max(0))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn lock_or_create(
        tx: &mut Transaction<'static, Postgres>,
        key: &StockKey,
        on_missing: OnMissing,
    ) -> Result<(LedgerEntry, bool), StoreError> {
        if let Some(entry) = Self::lock_entry(tx, key).await? {
            return Ok((entry, false));
        }
        let OnMissing::Create { reorder_level } = on_missing else {
            return Err(StoreError::NotFound);
        };
        let created = Self::insert_empty(tx, key, reorder_level).await?;
        let entry = Self::lock_entry(tx, key).await?.ok_or(StoreError::NotFound)?;
        Ok((entry, created))
    }

    async fn write_entry(
        tx: &mut Transaction<'static, Postgres>,
        entry: &LedgerEntry,
    ) -> Result<(), StoreError> {
        let record = entry.record();
        let key = record.key();

        sqlx::query(
            r#"
            UPDATE warehouse_stock
            SET quantity = $4, reserved = $5, damaged = $6, available = $7,
                reorder_level = $8, updated_at = $9
            WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3
            "#,
        )
        .bind(key.tenant_id.as_str())
        .bind(key.warehouse_id.as_str())
        .bind(key.product_id.as_str())
        .bind(record.quantity())
        .bind(record.reserved())
        .bind(record.damaged())
        .bind(record.available())
        .bind(record.reorder_level())
        .bind(record.updated_at())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;

        sqlx::query(
            "DELETE FROM stock_reservations WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3",
        )
        .bind(key.tenant_id.as_str())
        .bind(key.warehouse_id.as_str())
        .bind(key.product_id.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("clear_holds", e))?;

        if !entry.holds().is_empty() {
            let (orders, units): (Vec<String>, Vec<i64>) = entry
                .holds()
                .iter()
                .map(|(order, units)| (order.to_string(), *units))
                .unzip();

            sqlx::query(
                r#"
                INSERT INTO stock_reservations (tenant_id, warehouse_id, product_id, order_id, quantity)
                SELECT $1, $2, $3, h.order_id, h.quantity
                FROM UNNEST($4::text[], $5::bigint[]) AS h(order_id, quantity)
                "#,
            )
            .bind(key.tenant_id.as_str())
            .bind(key.warehouse_id.as_str())
            .bind(key.product_id.as_str())
            .bind(&orders)
            .bind(&units)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("write_holds", e))?;
        }

        Ok(())
    }

    async fn select_records(
        &self,
        operation: &'static str,
        filter: &str,
        binds: [&str; 2],
        limit: Option<usize>,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stock WHERE tenant_id = $1 AND {filter} \
             ORDER BY updated_at DESC LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(binds[0])
            .bind(binds[1])
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter().map(stock_from_row).collect()
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(skip(self), fields(key = %key), err)]
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM warehouse_stock \
             WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3"
        );
        let row = sqlx::query(&sql)
            .bind(key.tenant_id.as_str())
            .bind(key.warehouse_id.as_str())
            .bind(key.product_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_stock", e))?;

        row.as_ref().map(stock_from_row).transpose()
    }

    async fn list_for_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        self.select_records(
            "list_for_product",
            "product_id = $2",
            [tenant_id.as_str(), product_id.as_str()],
            None,
        )
        .await
    }

    async fn list_for_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
        limit: Option<usize>,
    ) -> Result<Vec<StockRecord>, StoreError> {
        self.select_records(
            "list_for_warehouse",
            "warehouse_id = $2",
            [tenant_id.as_str(), warehouse_id.as_str()],
            limit,
        )
        .await
    }

    #[instrument(skip(self, command), fields(key = %key, op = command.kind()), err)]
    async fn apply(
        &self,
        key: &StockKey,
        command: StockCommand,
        on_missing: OnMissing,
    ) -> Result<StockChange, StoreError> {
        let mut tx = self.begin().await?;
        let (mut entry, created) = Self::lock_or_create(&mut tx, key, on_missing).await?;

        // On error the transaction is dropped and rolled back, including a fresh row.
        let mut change = entry.execute(&command, Utc::now())?;
        change.created = created;

        Self::write_entry(&mut tx, &entry).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(change)
    }

    #[instrument(skip(self), fields(from = %from, to = %to_warehouse), err)]
    async fn transfer(
        &self,
        from: &StockKey,
        to_warehouse: &WarehouseId,
        quantity: i64,
        reorder_level: i64,
    ) -> Result<Transfer, StoreError> {
        let to = from.in_warehouse(to_warehouse.clone());
        if &to == from {
            return Err(
                StockError::validation("source and destination warehouses must differ").into(),
            );
        }

        let mut tx = self.begin().await?;
        let create = OnMissing::Create { reorder_level };
        let (mut source, mut dest) = if *from < to {
            let (source, _) = Self::lock_or_create(&mut tx, from, OnMissing::Fail).await?;
            let (dest, _) = Self::lock_or_create(&mut tx, &to, create).await?;
            (source, dest)
        } else {
            let (dest, _) = Self::lock_or_create(&mut tx, &to, create).await?;
            let (source, _) = Self::lock_or_create(&mut tx, from, OnMissing::Fail).await?;
            (source, dest)
        };

        let transfer = source.transfer_to(&mut dest, quantity, Utc::now())?;
        Self::write_entry(&mut tx, &source).await?;
        Self::write_entry(&mut tx, &dest).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(transfer)
    }

    #[instrument(skip(self), err)]
    async fn purge_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<u64, StoreError> {
        let mut tx = self.begin().await?;

        let reserved: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT reserved FROM warehouse_stock
            WHERE tenant_id = $1 AND warehouse_id = $2
            ORDER BY product_id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(warehouse_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_warehouse_stock", e))?;

        if reserved.iter().any(|r| *r > 0) {
            return Err(StoreError::ActiveReservations);
        }

        let deleted = sqlx::query(
            "DELETE FROM warehouse_stock WHERE tenant_id = $1 AND warehouse_id = $2",
        )
        .bind(tenant_id.as_str())
        .bind(warehouse_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purge_warehouse", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(deleted.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct PostgresWarehouseStore {
    pool: PgPool,
}

impl PostgresWarehouseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const WAREHOUSE_COLUMNS: &str = "tenant_id, id, name, location, is_active, created_at, updated_at";

#[async_trait]
impl WarehouseStore for PostgresWarehouseStore {
    #[instrument(skip(self, warehouse), fields(tenant_id = %warehouse.tenant_id, name = %warehouse.name), err)]
    async fn insert(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (tenant_id, id, name, location, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(warehouse.tenant_id.as_str())
        .bind(warehouse.id.as_str())
        .bind(&warehouse.name)
        .bind(warehouse.location.as_deref())
        .bind(warehouse.is_active)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_warehouse", e))?;
        Ok(warehouse)
    }

    async fn get(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<Warehouse>, StoreError> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE tenant_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(warehouse_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_warehouse", e))?;

        row.as_ref().map(warehouse_from_row).transpose()
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        active_only: bool,
    ) -> Result<Vec<Warehouse>, StoreError> {
        let sql = format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses \
             WHERE tenant_id = $1 AND (is_active OR NOT $2) ORDER BY name"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_warehouses", e))?;

        rows.iter().map(warehouse_from_row).collect()
    }

    async fn update(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE warehouses
            SET name = $3, location = $4, is_active = $5, updated_at = $6
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(warehouse.tenant_id.as_str())
        .bind(warehouse.id.as_str())
        .bind(&warehouse.name)
        .bind(warehouse.location.as_deref())
        .bind(warehouse.is_active)
        .bind(warehouse.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_warehouse", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(warehouse)
    }

    async fn delete(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM warehouses WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_str())
            .bind(warehouse_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_warehouse", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostgresAlertStore {
    pool: PgPool,
}

impl PostgresAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ALERT_COLUMNS: &str = "id, tenant_id, product_id, warehouse_id, alert_type, severity, message, \
                             is_resolved, created_at, resolved_at";

#[async_trait]
impl AlertStore for PostgresAlertStore {
    async fn open_if_absent(&self, alert: StockAlert) -> Result<Option<StockAlert>, StoreError> {
        let sql = format!(
            "INSERT INTO stock_alerts \
               (id, tenant_id, product_id, warehouse_id, alert_type, severity, message, is_resolved, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8) \
             ON CONFLICT (tenant_id, product_id, warehouse_id, alert_type) WHERE NOT is_resolved DO NOTHING \
             RETURNING {ALERT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(alert.id.as_str())
            .bind(alert.tenant_id.as_str())
            .bind(alert.product_id.as_str())
            .bind(alert.warehouse_id.as_str())
            .bind(alert.alert_type.as_str())
            .bind(alert.severity.as_str())
            .bind(&alert.message)
            .bind(alert.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("open_alert", e))?;

        row.as_ref().map(alert_from_row).transpose()
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        include_resolved: bool,
    ) -> Result<Vec<StockAlert>, StoreError> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM stock_alerts \
             WHERE tenant_id = $1 AND (NOT is_resolved OR $2) ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(include_resolved)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_alerts", e))?;

        rows.iter().map(alert_from_row).collect()
    }

    async fn resolve(
        &self,
        tenant_id: &TenantId,
        alert_id: &AlertId,
        now: DateTime<Utc>,
    ) -> Result<StockAlert, StoreError> {
        let sql = format!(
            "UPDATE stock_alerts \
             SET is_resolved = TRUE, resolved_at = COALESCE(resolved_at, $3) \
             WHERE tenant_id = $1 AND id = $2 \
             RETURNING {ALERT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(alert_id.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("resolve_alert", e))?
            .ok_or(StoreError::NotFound)?;

        alert_from_row(&row)
    }

    async fn count_open(
        &self,
        tenant_id: &TenantId,
        alert_type: AlertType,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_alerts WHERE tenant_id = $1 AND alert_type = $2 AND NOT is_resolved",
        )
        .bind(tenant_id.as_str())
        .bind(alert_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_open_alerts", e))?;

        Ok(count.max(0) as u64)
    }
}

fn id_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: TryFrom<String, Error = DomainError>,
{
    let raw: String = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("decode", e))?;
    T::try_from(raw).map_err(|e| StoreError::Backend(format!("corrupt {column}: {e}")))
}

fn column<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error("decode", e))
}

fn stock_from_row(row: &PgRow) -> Result<StockRecord, StoreError> {
    let key = StockKey::new(
        id_column(row, "tenant_id")?,
        id_column(row, "warehouse_id")?,
        id_column(row, "product_id")?,
    );
    StockRecord::restore(
        key,
        column(row, "quantity")?,
        column(row, "reserved")?,
        column(row, "damaged")?,
        column(row, "reorder_level")?,
        column(row, "updated_at")?,
    )
    .map_err(StoreError::from)
}

fn warehouse_from_row(row: &PgRow) -> Result<Warehouse, StoreError> {
    Ok(Warehouse {
        id: id_column(row, "id")?,
        tenant_id: id_column(row, "tenant_id")?,
        name: column(row, "name")?,
        location: column(row, "location")?,
        is_active: column(row, "is_active")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn alert_from_row(row: &PgRow) -> Result<StockAlert, StoreError> {
    let alert_type: String = column(row, "alert_type")?;
    let severity: String = column(row, "severity")?;
    Ok(StockAlert {
        id: id_column(row, "id")?,
        tenant_id: id_column(row, "tenant_id")?,
        product_id: id_column(row, "product_id")?,
        warehouse_id: id_column(row, "warehouse_id")?,
        alert_type: AlertType::parse(&alert_type)
            .ok_or_else(|| StoreError::Backend(format!("unknown alert type {alert_type}")))?,
        severity: Severity::parse(&severity)
            .ok_or_else(|| StoreError::Backend(format!("unknown severity {severity}")))?,
        message: column(row, "message")?,
        is_resolved: column(row, "is_resolved")?,
        created_at: column(row, "created_at")?,
        resolved_at: column(row, "resolved_at")?,
    })
}

/// `LIMIT` bind for an optional row cap; oversized caps mean "no cap".
fn sql_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                Some("23503") => StoreError::NotFound,
                Some("55P03") | Some("57014") | Some("40P01") | Some("40001") => {
                    StoreError::Transient(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Transient(format!("{} unavailable: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
