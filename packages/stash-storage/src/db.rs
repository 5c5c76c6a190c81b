use std::time::Duration;

use sqlx::{
	Sqlite, SqlitePool, Transaction,
	sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::{Result, schema};

#[derive(Clone)]
pub struct Db {
	pub pool: SqlitePool,
}
impl Db {
	pub async fn connect(cfg: &stash_config::Sqlite) -> Result<Self> {
		let options = SqliteConnectOptions::new()
			.filename(&cfg.path)
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal)
			.foreign_keys(true)
			.busy_timeout(Duration::from_secs(5));
		let pool = SqlitePoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.connect_with(options)
			.await?;

		Ok(Self { pool })
	}

	/// Opens a transaction that holds the write lock from its first statement, so reads inside
	/// it cannot go stale before the write lands.
	pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
		Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		// Triggers carry their own `;` separators, so the script goes through the multi-statement
		// path in one transaction.
		let mut tx = self.pool.begin().await?;

		sqlx::raw_sql(&sql).execute(&mut *tx).await?;

		tx.commit().await?;

		tracing::debug!("Schema ensured.");

		Ok(())
	}
}
