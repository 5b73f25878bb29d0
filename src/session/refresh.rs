//! Single-slot refresh gate.
//!
//! The gate is either idle or owned by one leader performing the refresh exchange. Requests
//! that hit a 401 while the leader is working enqueue a waiter and suspend on it; the leader
//! settles every waiter, in arrival order, in the same step that reopens the gate.

// self
use crate::{_prelude::*, auth::TokenSecret};

type Waiter = Arc<OnceCell<RefreshOutcome>>;

/// Result of a refresh episode as seen by waiting requests.
#[derive(Clone, Debug)]
pub(crate) enum RefreshOutcome {
	/// A new access token is current.
	Refreshed(TokenSecret),
	/// The exchange failed and the session was cleared.
	Expired,
	/// The leader was dropped before the exchange settled; waiters contend for the gate again.
	Abandoned,
}

#[derive(Default)]
pub(crate) enum RefreshState {
	#[default]
	Idle,
	Refreshing {
		pending: VecDeque<Waiter>,
	},
}
impl RefreshState {
	pub(crate) fn phase(&self) -> RefreshPhase {
		match self {
			Self::Idle => RefreshPhase::Idle,
			Self::Refreshing { pending } => RefreshPhase::Refreshing { pending: pending.len() },
		}
	}
}

/// Observable snapshot of the refresh gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No exchange is outstanding.
	Idle,
	/// One exchange is outstanding.
	Refreshing {
		/// Requests suspended on the exchange.
		pending: usize,
	},
}

/// How a request that received a 401 proceeds.
pub(crate) enum RefreshTicket<'a> {
	/// Perform the exchange, then settle the gate.
	Lead(RefreshLease<'a>),
	/// Suspend until the current leader settles.
	Wait(RefreshWait),
	/// Retry straight away with a token that superseded the one the request carried.
	Retry(TokenSecret),
}

/// Exclusive right to perform and settle the current refresh.
///
/// Dropping an unsettled lease reopens the gate and releases waiters as
/// [`RefreshOutcome::Abandoned`], so a cancelled leader can never strand them.
pub(crate) struct RefreshLease<'a> {
	slot: &'a Mutex<RefreshState>,
	settled: bool,
}
impl<'a> RefreshLease<'a> {
	pub(crate) fn new(slot: &'a Mutex<RefreshState>) -> Self {
		Self { slot, settled: false }
	}

	/// Reopens the gate and hands `outcome` to every waiter; returns how many were released.
	pub(crate) fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		release(self.slot, outcome)
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			release(self.slot, RefreshOutcome::Abandoned);
		}
	}
}

/// Handle a queued request suspends on.
pub(crate) struct RefreshWait(Waiter);
impl RefreshWait {
	pub(crate) fn new(waiter: Waiter) -> Self {
		Self(waiter)
	}

	pub(crate) async fn outcome(self) -> RefreshOutcome {
		self.0.wait().await.clone()
	}
}

fn release(slot: &Mutex<RefreshState>, outcome: RefreshOutcome) -> usize {
	let pending = match std::mem::take(&mut *slot.lock()) {
		RefreshState::Refreshing { pending } => pending,
		RefreshState::Idle => VecDeque::new(),
	};
	let released = pending.len();

	for waiter in pending {
		// Each waiter cell is filled exactly once, here.
		let _ = waiter.set_blocking(outcome.clone());
	}

	released
}
