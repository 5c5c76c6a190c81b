use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use stash_storage::{db::Db, queries};

use crate::{
	ACTIVE_MODEL_SETTING, Error, Result, StashService,
	semantic::{Refresh, SemanticIndex, refresh_item_embedding},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
	Idle,
	Running,
	Completed,
	Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReembedStatus {
	pub status: JobState,
	pub job_id: Option<Uuid>,
	pub model_id: Option<String>,
	pub processed: u64,
	pub total: u64,
	pub failed: u64,
	pub message: String,
}
impl ReembedStatus {
	pub fn idle() -> Self {
		Self {
			status: JobState::Idle,
			job_id: None,
			model_id: None,
			processed: 0,
			total: 0,
			failed: 0,
			message: "No re-embedding job has run.".to_string(),
		}
	}

	fn started(job_id: Uuid, model_id: &str) -> Self {
		Self {
			status: JobState::Running,
			job_id: Some(job_id),
			model_id: Some(model_id.to_string()),
			processed: 0,
			total: 0,
			failed: 0,
			message: format!("Loading embedding model {model_id:?}."),
		}
	}

	fn with_total(mut self, total: u64) -> Self {
		self.total = total;
		self.message = format!("Re-embedding {total} items.");

		self
	}

	fn progressed(&mut self, ok: bool) {
		self.processed += 1;

		if !ok {
			self.failed += 1;
		}

		self.message = format!("Re-embedded {} of {} items.", self.processed, self.total);
	}

	fn completed(mut self) -> Self {
		self.status = JobState::Completed;
		self.message = format!(
			"Re-embedded {} of {} items ({} failed).",
			self.processed - self.failed,
			self.total,
			self.failed
		);

		self
	}

	fn failed_with(mut self, message: impl Into<String>) -> Self {
		self.status = JobState::Failed;
		self.message = message.into();

		self
	}

	pub fn is_running(&self) -> bool {
		self.status == JobState::Running
	}
}

#[derive(Debug)]
pub enum ModelChange {
	/// The requested model is already active. Nothing was scheduled.
	Unchanged { model_id: String },
	Started(ReembedHandle),
}

#[derive(Debug)]
pub struct ReembedHandle {
	pub job_id: Uuid,
	pub model_id: String,
	status: watch::Receiver<ReembedStatus>,
	task: JoinHandle<()>,
}
impl ReembedHandle {
	pub fn status(&self) -> ReembedStatus {
		self.status.borrow().clone()
	}

	pub async fn wait(self) -> ReembedStatus {
		if let Err(err) = self.task.await {
			tracing::error!(job_id = %self.job_id, error = %err, "Re-embedding task aborted.");
		}

		self.status.borrow().clone()
	}
}

struct RunningGuard(Arc<SemanticIndex>);
impl Drop for RunningGuard {
	fn drop(&mut self) {
		self.0.running.store(false, Ordering::SeqCst);
	}
}

impl StashService {
	pub fn reembed_status(&self) -> ReembedStatus {
		self.semantic.status()
	}

	/// Switches the active embedding model and regenerates every stored item embedding on a
	/// background task.
	///
	/// The new model is loaded first; if that fails the job is marked failed and the old model
	/// stays active. A request while another job runs is rejected.
	pub async fn change_embedding_model(&self, model_id: &str) -> Result<ModelChange> {
		let model_id = model_id.trim();

		if self.semantic.catalog_model(model_id).is_none() {
			return Err(Error::invalid(format!(
				"Embedding model {model_id:?} is not in the configured catalog."
			)));
		}
		if self.semantic.running.load(Ordering::SeqCst) {
			return Err(job_running());
		}
		if self.semantic.active_model_id() == model_id {
			return Ok(ModelChange::Unchanged { model_id: model_id.to_string() });
		}

		claim(&self.semantic.running)?;

		let job_id = Uuid::new_v4();
		let guard = RunningGuard(self.semantic.clone());
		let status_rx = self.semantic.subscribe();

		self.semantic.status.send_replace(ReembedStatus::started(job_id, model_id));

		tracing::info!(%job_id, model_id, "Embedding model change started.");

		let job = ReembedJob {
			job_id,
			model_id: model_id.to_string(),
			db: self.db.clone(),
			semantic: self.semantic.clone(),
			progress_every: u64::from(self.cfg.reembed.progress_every.max(1)),
		};
		let task = tokio::spawn(async move {
			let _guard = guard;

			job.run().await;
		});

		Ok(ModelChange::Started(ReembedHandle {
			job_id,
			model_id: model_id.to_string(),
			status: status_rx,
			task,
		}))
	}
}

struct ReembedJob {
	job_id: Uuid,
	model_id: String,
	db: Db,
	semantic: Arc<SemanticIndex>,
	progress_every: u64,
}
impl ReembedJob {
	async fn run(self) {
		let status = ReembedStatus::started(self.job_id, &self.model_id);
		let Some(embedder) = self.semantic.embedder_for(&self.model_id).await else {
			self.finish(status.failed_with(format!(
				"Embedding model {:?} failed to load. The active model is unchanged.",
				self.model_id
			)));

			return;
		};

		if let Err(err) =
			queries::set_setting(&self.db.pool, ACTIVE_MODEL_SETTING, &self.model_id).await
		{
			self.finish(status.failed_with(format!("Failed to persist the model change: {err}.")));

			return;
		}

		self.semantic.set_active(&self.model_id);

		let ids = match queries::item_ids_for_embedding(&self.db.pool, false).await {
			Ok(ids) => ids,
			Err(err) => {
				self.finish(status.failed_with(format!("Failed to list items: {err}.")));

				return;
			},
		};
		let mut status = status.with_total(ids.len() as u64);

		self.semantic.status.send_replace(status.clone());

		for item_id in ids {
			let ok = match refresh_item_embedding(&self.db, embedder.as_ref(), item_id).await {
				Ok(Refresh::Stored | Refresh::Gone) => true,
				Ok(Refresh::Failed) => {
					tracing::warn!(
						job_id = %self.job_id,
						%item_id,
						"Failed to regenerate item embedding."
					);

					false
				},
				Err(err) => {
					tracing::warn!(
						job_id = %self.job_id,
						%item_id,
						error = %err,
						"Failed to store regenerated embedding."
					);

					false
				},
			};

			status.progressed(ok);

			if status.processed % self.progress_every == 0 {
				self.semantic.status.send_replace(status.clone());
			}
		}

		self.finish(status.completed());
	}

	fn finish(&self, status: ReembedStatus) {
		match status.status {
			JobState::Failed => tracing::warn!(
				job_id = %self.job_id,
				model_id = %self.model_id,
				message = %status.message,
				"Embedding model change failed."
			),
			_ => tracing::info!(
				job_id = %self.job_id,
				model_id = %self.model_id,
				processed = status.processed,
				failed = status.failed,
				"Embedding model change finished."
			),
		}

		self.semantic.status.send_replace(status);
	}
}

fn claim(flag: &AtomicBool) -> Result<()> {
	flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
		.map(|_| ())
		.map_err(|_| job_running())
}

fn job_running() -> Error {
	Error::JobRunning { message: "An embedding model change is already in progress.".to_string() }
}
