//! # Dispute Module Pallet
//!
//! Buyer-gated dispute records for the AgoraChain task market, resolved by an
//! owner-curated set of resolvers.
//!
//! ## Overview
//!
//! The module and the market reference each other as independently owned
//! actors. The market knows the module only by its sovereign account, which it
//! accepts for `mark_disputed` / `resolve_dispute`; the module drives the
//! market through [`TaskMarketInterface`]. A dispute can be opened by the
//! task's buyer directly, or arrive delegated from the market
//! (`dispute_submission`); both paths converge on the same record and the same
//! `mark_disputed` callback.
//!
//! Resolution is permissioned: only accounts in the resolver set may resolve,
//! and a record resolves at most once. A task that is already `Disputed` on
//! the market but has no record here (its dispute predates this module's
//! installation) is resolvable anyway; a minimal record is reconstructed from
//! the market's view.
//!
//! ## Interface
//!
//! ### Dispatchable Functions
//!
//! - `open_dispute` - Buyer opens a dispute within the challenge window
//! - `resolve_dispute` - A resolver records the outcome and settles the task
//! - `add_resolver` / `remove_resolver` - Owner curates the resolver set
//! - `transfer_ownership` / `accept_ownership` - Two-step owner handover

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(test)]
mod tests;

use alloc::vec::Vec;

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::{pallet_prelude::*, traits::UnixTime, PalletId};
    use frame_system::pallet_prelude::*;
    use pallet_task_market::{
        DisputeModuleInterface, DisputeOutcome, TaskId, TaskMarketInterface, TaskStatus,
    };
    use sp_runtime::traits::AccountIdConversion;

    /// Per-task dispute record.
    #[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct DisputeRecord<T: Config> {
        /// The buyer that opened (or inherited) the dispute.
        pub buyer: T::AccountId,
        /// Whether the record has been opened.
        pub opened: bool,
        /// Whether the record has been resolved.
        pub resolved: bool,
        /// URI of the buyer's complaint.
        pub dispute_uri: BoundedVec<u8, T::MaxUriLength>,
        /// URI of the resolution statement.
        pub resolution_uri: BoundedVec<u8, T::MaxUriLength>,
        /// The recorded outcome; SellerWins until resolved otherwise.
        pub outcome: DisputeOutcome,
        /// Unix seconds when the dispute was opened (0 for reconstructed
        /// records).
        pub opened_at: u64,
    }

    impl<T: Config> codec::DecodeWithMemTracking for DisputeRecord<T> {}

    /// The pallet's configuration trait.
    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching runtime event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;

        /// The task market this module opens and resolves disputes against.
        type Market: TaskMarketInterface<Self::AccountId>;

        /// Wall-clock source, whole seconds.
        type TimeProvider: UnixTime;

        /// Pallet ID; derives the sovereign account the market recognizes.
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Maximum byte length of dispute and resolution URIs.
        #[pallet::constant]
        type MaxUriLength: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    /// Map from task id to its dispute record (at most one per task).
    #[pallet::storage]
    pub type Disputes<T: Config> =
        StorageMap<_, Blake2_128Concat, TaskId, DisputeRecord<T>, OptionQuery>;

    /// The module owner (resolver-set curation, ownership handover).
    #[pallet::storage]
    pub type Owner<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// Proposed next owner awaiting acceptance.
    #[pallet::storage]
    pub type PendingOwner<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// Accounts allowed to resolve disputes.
    #[pallet::storage]
    pub type Resolvers<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, bool, ValueQuery>;

    // =========================================================
    // Genesis
    // =========================================================

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        pub owner: Option<T::AccountId>,
        pub resolvers: Vec<T::AccountId>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            if let Some(owner) = &self.owner {
                Owner::<T>::put(owner);
            }
            for resolver in &self.resolvers {
                Resolvers::<T>::insert(resolver, true);
            }
        }
    }

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A dispute was opened.
        DisputeOpened {
            task_id: TaskId,
            buyer: T::AccountId,
            dispute_uri: Vec<u8>,
        },
        /// A dispute was resolved.
        DisputeResolved {
            task_id: TaskId,
            resolver: T::AccountId,
            outcome: DisputeOutcome,
            resolution_uri: Vec<u8>,
        },
        /// An account joined the resolver set.
        ResolverAdded { resolver: T::AccountId },
        /// An account left the resolver set.
        ResolverRemoved { resolver: T::AccountId },
        /// An ownership handover was proposed.
        OwnershipTransferStarted {
            current: T::AccountId,
            pending: T::AccountId,
        },
        /// The ownership handover completed.
        OwnershipTransferred {
            previous: T::AccountId,
            new: T::AccountId,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        /// The task does not exist on the market.
        UnknownTask,
        /// The task has no submission to dispute.
        TaskNotSubmitted,
        /// The task is not disputed on the market.
        TaskNotDisputed,
        /// Only the task's buyer can open a dispute.
        NotTaskBuyer,
        /// The challenge window has closed.
        ChallengeWindowClosed,
        /// A dispute is already on record for this task.
        DisputeAlreadyOpened,
        /// The dispute has already been resolved.
        DisputeAlreadyResolved,
        /// Only an approved resolver can resolve.
        NotResolver,
        /// Only the module owner can perform this action.
        NotOwner,
        /// Only the proposed owner can accept the handover.
        NotPendingOwner,
        /// The URI exceeds the maximum allowed length.
        UriTooLong,
    }

    // =========================================================
    // Weight trait
    // =========================================================

    pub trait WeightInfo {
        fn open_dispute() -> Weight;
        fn resolve_dispute() -> Weight;
        fn add_resolver() -> Weight;
        fn remove_resolver() -> Weight;
        fn transfer_ownership() -> Weight;
        fn accept_ownership() -> Weight;
    }

    pub struct SubstrateWeight<T>(core::marker::PhantomData<T>);

    impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
        fn open_dispute() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn resolve_dispute() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn add_resolver() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn remove_resolver() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn transfer_ownership() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn accept_ownership() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Open a dispute against a submitted task.
        ///
        /// The caller must be the task's buyer and the challenge window must
        /// still be open (strictly before the deadline).
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::open_dispute())]
        pub fn open_dispute(
            origin: OriginFor<T>,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_open_dispute(&who, task_id, dispute_uri)
        }

        /// Resolve a dispute with the supplied outcome.
        ///
        /// Only approved resolvers may resolve, and each record resolves at
        /// most once. A task disputed on the market with no record here
        /// (opened under a previous module) gets a minimal record
        /// reconstructed before resolution.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::resolve_dispute())]
        pub fn resolve_dispute(
            origin: OriginFor<T>,
            task_id: TaskId,
            outcome: DisputeOutcome,
            resolution_uri: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(Resolvers::<T>::get(&who), Error::<T>::NotResolver);

            let bounded_resolution: BoundedVec<u8, T::MaxUriLength> = resolution_uri
                .clone()
                .try_into()
                .map_err(|_| Error::<T>::UriTooLong)?;

            let mut record = match Disputes::<T>::get(task_id) {
                Some(record) => {
                    ensure!(!record.resolved, Error::<T>::DisputeAlreadyResolved);
                    record
                }
                None => {
                    let view =
                        T::Market::submission_view(task_id).ok_or(Error::<T>::UnknownTask)?;
                    ensure!(
                        view.status == TaskStatus::Disputed,
                        Error::<T>::TaskNotDisputed
                    );
                    DisputeRecord::<T> {
                        buyer: view.buyer,
                        opened: true,
                        resolved: false,
                        dispute_uri: BoundedVec::new(),
                        resolution_uri: BoundedVec::new(),
                        outcome: DisputeOutcome::SellerWins,
                        opened_at: 0,
                    }
                }
            };

            T::Market::resolve_dispute(&Self::account_id(), task_id, outcome)?;

            record.resolved = true;
            record.outcome = outcome;
            record.resolution_uri = bounded_resolution;
            Disputes::<T>::insert(task_id, &record);

            Self::deposit_event(Event::DisputeResolved {
                task_id,
                resolver: who,
                outcome,
                resolution_uri,
            });

            Ok(())
        }

        /// Add an account to the resolver set (owner only).
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::add_resolver())]
        pub fn add_resolver(origin: OriginFor<T>, resolver: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_owner(&who)?;

            Resolvers::<T>::insert(&resolver, true);

            Self::deposit_event(Event::ResolverAdded { resolver });

            Ok(())
        }

        /// Remove an account from the resolver set (owner only).
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::remove_resolver())]
        pub fn remove_resolver(origin: OriginFor<T>, resolver: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_owner(&who)?;

            Resolvers::<T>::remove(&resolver);

            Self::deposit_event(Event::ResolverRemoved { resolver });

            Ok(())
        }

        /// Propose a new owner (owner only). Takes effect when accepted.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::transfer_ownership())]
        pub fn transfer_ownership(origin: OriginFor<T>, new_owner: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_owner(&who)?;

            PendingOwner::<T>::put(&new_owner);

            Self::deposit_event(Event::OwnershipTransferStarted {
                current: who,
                pending: new_owner,
            });

            Ok(())
        }

        /// Accept a proposed ownership handover.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::accept_ownership())]
        pub fn accept_ownership(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let pending = PendingOwner::<T>::get().ok_or(Error::<T>::NotPendingOwner)?;
            ensure!(pending == who, Error::<T>::NotPendingOwner);

            let previous = Owner::<T>::get().ok_or(Error::<T>::NotOwner)?;
            Owner::<T>::put(&who);
            PendingOwner::<T>::kill();

            Self::deposit_event(Event::OwnershipTransferred {
                previous,
                new: who,
            });

            Ok(())
        }
    }

    // =========================================================
    // Internal helpers
    // =========================================================

    impl<T: Config> Pallet<T> {
        /// The sovereign account this module presents to the market.
        pub fn account_id() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        fn now() -> u64 {
            T::TimeProvider::now().as_secs()
        }

        fn ensure_owner(who: &T::AccountId) -> DispatchResult {
            ensure!(Owner::<T>::get().as_ref() == Some(who), Error::<T>::NotOwner);
            Ok(())
        }

        pub(crate) fn do_open_dispute(
            opener: &T::AccountId,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            let bounded_uri: BoundedVec<u8, T::MaxUriLength> = dispute_uri
                .clone()
                .try_into()
                .map_err(|_| Error::<T>::UriTooLong)?;

            ensure!(
                !Disputes::<T>::contains_key(task_id),
                Error::<T>::DisputeAlreadyOpened
            );

            let view = T::Market::submission_view(task_id).ok_or(Error::<T>::UnknownTask)?;
            ensure!(
                view.status == TaskStatus::Submitted,
                Error::<T>::TaskNotSubmitted
            );
            ensure!(&view.buyer == opener, Error::<T>::NotTaskBuyer);

            let deadline = view.submitted_at.saturating_add(view.challenge_window_secs);
            ensure!(Self::now() < deadline, Error::<T>::ChallengeWindowClosed);

            let buyer = view.buyer;
            Disputes::<T>::insert(
                task_id,
                DisputeRecord::<T> {
                    buyer: buyer.clone(),
                    opened: true,
                    resolved: false,
                    dispute_uri: bounded_uri,
                    resolution_uri: BoundedVec::new(),
                    outcome: DisputeOutcome::SellerWins,
                    opened_at: Self::now(),
                },
            );

            T::Market::mark_disputed(&Self::account_id(), task_id, dispute_uri.clone())?;

            Self::deposit_event(Event::DisputeOpened {
                task_id,
                buyer,
                dispute_uri,
            });

            Ok(())
        }
    }

    impl<T: Config> DisputeModuleInterface<T::AccountId> for Pallet<T> {
        fn open_dispute(
            task_id: TaskId,
            opener: &T::AccountId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            Self::do_open_dispute(opener, task_id, dispute_uri)
        }
    }
}
