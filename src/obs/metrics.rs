// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{Stage, StageOutcome};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_stage_outcome(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"xbl_profile_broker_stage_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

#[derive(Debug, Default)]
struct StageCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}

/// Thread-safe per-stage counters shared by every manager a service creates.
#[derive(Debug, Default)]
pub struct StageMetrics {
	refresh: StageCounters,
	authenticate: StageCounters,
	authorize: StageCounters,
	fetch: StageCounters,
	cache_hits: AtomicU64,
}
impl StageMetrics {
	/// Returns how many requests the stage has sent.
	pub fn attempts(&self, stage: Stage) -> u64 {
		self.counters(stage).attempts.load(Ordering::Relaxed)
	}

	/// Returns how many requests of the stage completed.
	pub fn successes(&self, stage: Stage) -> u64 {
		self.counters(stage).success.load(Ordering::Relaxed)
	}

	/// Returns how many requests of the stage failed.
	pub fn failures(&self, stage: Stage) -> u64 {
		self.counters(stage).failure.load(Ordering::Relaxed)
	}

	/// Returns how many lookups were answered from the profile cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	pub(crate) fn record(&self, stage: Stage, outcome: StageOutcome) {
		let counters = self.counters(stage);
		let counter = match outcome {
			StageOutcome::Attempt => &counters.attempts,
			StageOutcome::Success => &counters.success,
			StageOutcome::Failure => &counters.failure,
		};

		counter.fetch_add(1, Ordering::Relaxed);
		record_stage_outcome(stage, outcome);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	fn counters(&self, stage: Stage) -> &StageCounters {
		match stage {
			Stage::Refresh => &self.refresh,
			Stage::Authenticate => &self.authenticate,
			Stage::Authorize => &self.authorize,
			Stage::Fetch => &self.fetch,
		}
	}
}
