use serde::Serialize;

use stash_storage::queries;

use crate::{
	Error, Result, StashService,
	semantic::{Refresh, refresh_item_embedding},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
	pub processed: u64,
	pub failed: u64,
	/// Items that already carried an embedding, or were deleted before their turn.
	pub skipped_total: u64,
}

impl StashService {
	/// Embeds items that have no embedding yet, or every item when `force` is set. Per-item
	/// failures are counted, not fatal.
	pub async fn backfill_embeddings(&self, force: bool) -> Result<BackfillReport> {
		let Some(embedder) = self.semantic.embedder().await else {
			return Err(Error::Provider {
				message: format!(
					"Embedding model {:?} is unavailable.",
					self.semantic.active_model_id()
				),
			});
		};
		let ids = queries::item_ids_for_embedding(&self.db.pool, !force).await?;
		let total = queries::count_items(&self.db.pool).await?;
		let progress_every = u64::from(self.cfg.reembed.progress_every.max(1));
		let mut report = BackfillReport {
			skipped_total: (total as u64).saturating_sub(ids.len() as u64),
			..Default::default()
		};

		tracing::info!(
			model_id = %embedder.model_id(),
			pending = ids.len(),
			force,
			"Embedding backfill started."
		);

		for (idx, &item_id) in ids.iter().enumerate() {
			match refresh_item_embedding(&self.db, embedder.as_ref(), item_id).await {
				Ok(Refresh::Stored) => report.processed += 1,
				Ok(Refresh::Gone) => report.skipped_total += 1,
				Ok(Refresh::Failed) => report.failed += 1,
				Err(err) => {
					tracing::warn!(%item_id, error = %err, "Failed to store embedding.");

					report.failed += 1;
				},
			}

			let done = idx as u64 + 1;

			if done % progress_every == 0 {
				tracing::info!(done, pending = ids.len(), "Embedding backfill progress.");
			}
		}

		tracing::info!(
			processed = report.processed,
			failed = report.failed,
			skipped_total = report.skipped_total,
			"Embedding backfill finished."
		);

		Ok(report)
	}
}
