//! Observability helpers for the token chain and profile lookups.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `xbl_profile_broker.stage` with the `stage` and
//!   `call_site` fields, plus `warn` events when cached entries are discarded.
//! - Enable `metrics` to increment the `xbl_profile_broker_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.
//!
//! Independently of both flags, every lookup returns a [`StageTrace`] describing which
//! network stages actually ran.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Network stages performed while resolving a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	/// Refresh-token exchange minting a new access token.
	Refresh,
	/// User authentication turning the access token into a user token.
	Authenticate,
	/// XSTS authorization turning the user token into an XSTS token + identity.
	Authorize,
	/// Profile settings request.
	Fetch,
}
impl Stage {
	/// Every stage in chain order.
	pub const ALL: [Stage; 4] = [Stage::Refresh, Stage::Authenticate, Stage::Authorize, Stage::Fetch];

	/// Returns a stable label suitable for span fields, metric labels, and diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Refresh => "refresh",
			Stage::Authenticate => "authenticate",
			Stage::Authorize => "authorize",
			Stage::Fetch => "fetch",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// A stage request is about to be sent.
	Attempt,
	/// The stage completed.
	Success,
	/// The stage failed and the error was propagated.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Ordered record of the stages invoked for one call.
///
/// The trace is handed back as a value; it never feeds control flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageTrace(Vec<Stage>);
impl StageTrace {
	/// Appends a stage.
	pub fn push(&mut self, stage: Stage) {
		self.0.push(stage);
	}

	/// Returns the recorded stages in invocation order.
	pub fn stages(&self) -> &[Stage] {
		&self.0
	}

	/// Returns `true` if the stage ran.
	pub fn contains(&self, stage: Stage) -> bool {
		self.0.contains(&stage)
	}

	/// Returns `true` when no network stage ran.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Display for StageTrace {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, stage) in self.0.iter().enumerate() {
			if idx > 0 {
				f.write_str(", ")?;
			}

			f.write_str(stage.as_str())?;
		}

		Ok(())
	}
}
impl FromIterator<Stage> for StageTrace {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = Stage>,
	{
		Self(iter.into_iter().collect())
	}
}
impl Extend<Stage> for StageTrace {
	fn extend<I>(&mut self, iter: I)
	where
		I: IntoIterator<Item = Stage>,
	{
		self.0.extend(iter);
	}
}
