//! Task-market traits and interfaces.

use alloc::vec::Vec;
use codec::{Decode, Encode, MaxEncodedLen};
use frame_support::pallet_prelude::{DispatchResult, RuntimeDebug};
use scale_info::TypeInfo;
use sp_runtime::DispatchError;

use crate::pallet::{TaskId, TaskStatus};

// =========================================================
// Dispute outcome
// =========================================================

/// The four-way verdict a dispute resolution hands back to the market.
#[derive(
    Clone,
    Copy,
    Encode,
    Decode,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
    MaxEncodedLen,
    codec::DecodeWithMemTracking,
)]
pub enum DisputeOutcome {
    /// Escrow and bond go to the seller side.
    SellerWins,
    /// Escrow and bond go to the buyer.
    BuyerWins,
    /// Escrow splits in half (floor to the buyer); bond refunds.
    Split,
    /// Escrow returns to the buyer; bond refunds.
    Cancel,
}

impl Default for DisputeOutcome {
    fn default() -> Self {
        DisputeOutcome::SellerWins
    }
}

// =========================================================
// Market Interface
// =========================================================

/// A submitted task as seen by the dispute module.
#[derive(Clone, Eq, PartialEq, RuntimeDebug)]
pub struct SubmissionView<AccountId> {
    /// The task's buyer.
    pub buyer: AccountId,
    /// Current task status.
    pub status: TaskStatus,
    /// Unix seconds of the deliverable submission (0 if none).
    pub submitted_at: u64,
    /// Challenge window from the task's listing policy.
    pub challenge_window_secs: u64,
}

/// Interface to the task market for the dispute module.
///
/// `mark_disputed` and `resolve_dispute` are capability-gated: the market
/// rejects any `caller` other than the currently installed dispute-module
/// account.
pub trait TaskMarketInterface<AccountId> {
    /// Buyer, status, and challenge deadline inputs for a task.
    fn submission_view(task_id: TaskId) -> Option<SubmissionView<AccountId>>;

    /// Move a submitted task to `Disputed`.
    fn mark_disputed(caller: &AccountId, task_id: TaskId, dispute_uri: Vec<u8>) -> DispatchResult;

    /// Settle a disputed task with the supplied outcome.
    fn resolve_dispute(
        caller: &AccountId,
        task_id: TaskId,
        outcome: DisputeOutcome,
    ) -> DispatchResult;
}

// =========================================================
// Dispute Module Interface
// =========================================================

/// Outbound hook the market uses to delegate a buyer-opened dispute.
pub trait DisputeModuleInterface<AccountId> {
    /// Open a dispute on behalf of `opener` (the task's buyer).
    fn open_dispute(task_id: TaskId, opener: &AccountId, dispute_uri: Vec<u8>) -> DispatchResult;
}

/// Runtimes without a dispute module reject delegation outright.
impl<AccountId> DisputeModuleInterface<AccountId> for () {
    fn open_dispute(_: TaskId, _: &AccountId, _: Vec<u8>) -> DispatchResult {
        Err(DispatchError::Unavailable)
    }
}
