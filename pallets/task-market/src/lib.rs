//! # Task Market Pallet
//!
//! The AgoraChain task escrow state machine: buyers purchase delegated work
//! against a listing, the agent side quotes, escrow and an optional seller
//! bond move into pallet custody, and a small settlement protocol pays the
//! buyer, the snapshotted seller, and the bond funder out again.
//!
//! ## Overview
//!
//! A task traverses `Open -> Quoted -> Active -> Submitted -> Settled`, with
//! `Disputed` between submission and settlement and `Cancelled` reachable from
//! every pre-settlement state. Settled and Cancelled are terminal.
//!
//! Custody discipline:
//! - Deposits pull tokens with a balance-delta check, so fee-on-transfer
//!   assets fail deterministically at deposit time.
//! - Every transition sets its new status before the first outbound transfer
//!   and runs under a custody lock.
//! - The seller address is snapshotted when the quote is accepted; a later
//!   agent transfer redirects neither execution rights nor payouts.
//!
//! The dispute module is an external principal: its account is installed by
//! the admin (timelocked once set) and is the only caller accepted for
//! `mark_disputed` / `resolve_dispute`.
//!
//! ## Interface
//!
//! ### Dispatchable Functions
//!
//! - `post_task` - Post a task against an active listing
//! - `propose_quote` - Agent side quotes units, price, and expiry
//! - `accept_task` - Implicit quote from listing pricing (`quote_required = false`)
//! - `fund_seller_bond` - Deposit the required seller bond
//! - `fund_task` - Buyer deposits the quoted total into escrow
//! - `accept_quote` - Buyer activates the task; seller snapshot taken
//! - `seller_cancel_quote` - Agent side withdraws an unfunded quote
//! - `cancel_task` - Buyer cancels pre-activation, refunding deposits
//! - `submit_deliverable` - Snapshotted seller submits the artifact
//! - `accept_submission` - Buyer settles on the accepted path
//! - `settle_after_timeout` - Anyone settles a silent buyer out
//! - `dispute_submission` - Buyer opens a dispute via the dispute module
//! - `mark_disputed` / `resolve_dispute` - Dispute-module-only callbacks
//! - `settle_after_post_dispute_timeout` - Anyone settles a stale dispute
//! - `cancel_for_non_delivery` - Buyer claims escrow plus bond after the
//!   delivery window lapses
//! - `set_dispute_module` / `cancel_dispute_module_update` /
//!   `execute_dispute_module_update` - Timelocked module upgrade
//! - `propose_admin` / `accept_admin` - Two-step admin transfer

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;
pub use traits::{DisputeModuleInterface, DisputeOutcome, SubmissionView, TaskMarketInterface};

pub mod traits;


use alloc::vec::Vec;
use sp_runtime::Saturating;

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::{
        pallet_prelude::*,
        traits::UnixTime,
        PalletId,
    };
    use frame_system::pallet_prelude::*;
    use pallet_agent_identity::{AgentId, AgentIdentityInterface};
    use pallet_listing_registry::{
        ListingId, ListingRegistryInterface, ListingTerms, BPS_DENOMINATOR,
    };
    use pallet_payment_assets::{AssetId, PaymentAssets};
    use sp_core::H256;
    use sp_runtime::traits::{AccountIdConversion, AtLeast32BitUnsigned, Zero};

    // =========================================================
    // Type Aliases
    // =========================================================

    /// Type alias for task IDs (sequential, non-zero).
    pub type TaskId = u64;

    // =========================================================
    // Enums
    // =========================================================

    /// Task status enum. Settled and Cancelled are terminal.
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
        Default,
        codec::DecodeWithMemTracking,
    )]
    pub enum TaskStatus {
        /// Posted, awaiting a quote.
        #[default]
        Open,
        /// Quote on record, awaiting funding and acceptance.
        Quoted,
        /// Quote accepted, seller snapshotted, delivery window running.
        Active,
        /// Deliverable on record, challenge window running.
        Submitted,
        /// Dispute opened, awaiting resolution.
        Disputed,
        /// Escrow and bond paid out.
        Settled,
        /// Cancelled; deposits refunded per the cancellation path.
        Cancelled,
    }

    /// Which terminal transition produced a settlement.
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
    pub enum SettlementPath {
        /// Buyer accepted the submission.
        Accepted,
        /// Challenge window lapsed with a silent buyer.
        Timeout,
        /// Post-dispute window lapsed without resolution.
        PostDisputeTimeout,
        /// Dispute resolved for the seller.
        DisputeSellerWins,
        /// Dispute resolved for the buyer.
        DisputeBuyerWins,
        /// Dispute resolved half-and-half.
        DisputeSplit,
        /// Dispute resolved as a cancellation.
        DisputeCancel,
    }

    // =========================================================
    // Structs
    // =========================================================

    /// A task stored on-chain.
    #[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct Task<T: Config> {
        /// The listing this task was posted against.
        pub listing_id: ListingId,
        /// Agent id snapshotted from the listing at post time.
        pub agent_id: AgentId,
        /// The account that posted and pays for the task.
        pub buyer: T::AccountId,
        /// Payment asset snapshotted from the listing pricing.
        pub payment_token: AssetId,
        /// Opaque task URI.
        pub task_uri: BoundedVec<u8, T::MaxUriLength>,
        /// Units of work the buyer asked for.
        pub proposed_units: u32,
        /// Units of work the quote covers.
        pub quoted_units: u32,
        /// Total price of the quote.
        pub quoted_total_price: T::Balance,
        /// Unix-seconds funding deadline for the quote (0 = no expiry).
        pub quote_expiry: u64,
        /// Escrow held for this task.
        pub funded_amount: T::Balance,
        /// Whether escrow funding happened (distinguishes zero-price tasks).
        pub escrow_funded: bool,
        /// Seller bond held for this task.
        pub seller_bond: T::Balance,
        /// The account that deposited the bond; sole refund target.
        pub bond_funder: Option<T::AccountId>,
        /// Agent owner snapshotted at quote acceptance; sole post-activation
        /// seller principal.
        pub seller: Option<T::AccountId>,
        /// Artifact URI of the deliverable.
        pub artifact_uri: BoundedVec<u8, T::MaxUriLength>,
        /// Artifact digest of the deliverable.
        pub artifact_hash: H256,
        /// Unix seconds of quote acceptance (0 if not activated).
        pub activated_at: u64,
        /// Unix seconds of deliverable submission (0 if none).
        pub submitted_at: u64,
        /// Unix seconds of dispute opening (0 if none).
        pub disputed_at: u64,
        /// Current status.
        pub status: TaskStatus,
        /// Set exactly once, on settlement or non-delivery cancellation.
        pub settled: bool,
    }

    impl<T: Config> codec::DecodeWithMemTracking for Task<T> {}

    /// A scheduled dispute-module swap waiting out its timelock.
    #[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct PendingModuleUpdate<T: Config> {
        /// The module account to install.
        pub module: T::AccountId,
        /// Unix seconds after which the swap may execute.
        pub execute_after: u64,
    }

    impl<T: Config> codec::DecodeWithMemTracking for PendingModuleUpdate<T> {}

    // =========================================================
    // Config
    // =========================================================

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching runtime event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;

        /// Unit of account for escrow and bond custody.
        type Balance: Parameter
            + Member
            + AtLeast32BitUnsigned
            + Copy
            + Default
            + MaxEncodedLen;

        /// Payment ledger the market pulls deposits from and pays out of.
        type Assets: PaymentAssets<Self::AccountId, Self::Balance>;

        /// Agent identity for authorization and the seller snapshot.
        type AgentIdentity: AgentIdentityInterface<Self::AccountId>;

        /// Listing registry for pricing and policy lookups.
        type Listings: ListingRegistryInterface<Self::Balance>;

        /// Outbound hook for buyer-delegated dispute opening.
        type DisputeRouter: DisputeModuleInterface<Self::AccountId>;

        /// Wall-clock source, whole seconds.
        type TimeProvider: UnixTime;

        /// Pallet ID for custody account derivation.
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Maximum byte length of task and artifact URIs.
        #[pallet::constant]
        type MaxUriLength: Get<u32>;

        /// Seconds a scheduled dispute-module swap waits before it may execute.
        #[pallet::constant]
        type DisputeModuleUpdateDelay: Get<u64>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type Tasks<T: Config> = StorageMap<_, Blake2_128Concat, TaskId, Task<T>, OptionQuery>;

    /// Total number of tasks created. Task ids are `1..=TaskCount`.
    #[pallet::storage]
    pub type TaskCount<T: Config> = StorageValue<_, u64, ValueQuery>;

    /// The market administrator (dispute-module upgrades, admin transfer).
    #[pallet::storage]
    pub type Admin<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// Proposed next administrator awaiting acceptance.
    #[pallet::storage]
    pub type PendingAdmin<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// The installed dispute-module account.
    #[pallet::storage]
    pub type DisputeModule<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// A scheduled dispute-module swap, if any.
    #[pallet::storage]
    pub type PendingDisputeModule<T: Config> =
        StorageValue<_, PendingModuleUpdate<T>, OptionQuery>;

    /// Transient guard against recursive entry into custody-moving calls.
    #[pallet::storage]
    pub type CustodyLock<T: Config> = StorageValue<_, bool, ValueQuery>;

    // =========================================================
    // Genesis
    // =========================================================

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        pub admin: Option<T::AccountId>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            if let Some(admin) = &self.admin {
                Admin::<T>::put(admin);
            }
        }
    }

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A task was posted against a listing.
        TaskPosted {
            task_id: TaskId,
            listing_id: ListingId,
            agent_id: AgentId,
            buyer: T::AccountId,
            task_uri: Vec<u8>,
            proposed_units: u32,
        },
        /// The agent side proposed a quote.
        QuoteProposed {
            task_id: TaskId,
            quoted_units: u32,
            quoted_total_price: T::Balance,
            expiry: u64,
        },
        /// The agent side accepted the task at listing pricing.
        TaskAccepted {
            task_id: TaskId,
            quoted_units: u32,
            quoted_total_price: T::Balance,
        },
        /// The seller bond was deposited.
        SellerBondFunded { task_id: TaskId, amount: T::Balance },
        /// The buyer funded escrow in full.
        TaskFunded { task_id: TaskId, amount: T::Balance },
        /// The buyer accepted the quote; the task is active.
        QuoteAccepted { task_id: TaskId },
        /// The agent side withdrew an unfunded quote.
        SellerCancelledQuote {
            task_id: TaskId,
            bond_refund: T::Balance,
        },
        /// The buyer cancelled pre-activation.
        TaskCancelled { task_id: TaskId },
        /// The snapshotted seller submitted the deliverable.
        DeliverableSubmitted {
            task_id: TaskId,
            artifact_uri: Vec<u8>,
            artifact_hash: H256,
        },
        /// The buyer accepted the submission.
        SubmissionAccepted { task_id: TaskId },
        /// A dispute was recorded against the submission.
        SubmissionDisputed {
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        },
        /// Settlement summary (legacy shape).
        TaskSettled {
            task_id: TaskId,
            buyer_payout: T::Balance,
            seller_bond_refund: T::Balance,
        },
        /// Full settlement breakdown.
        TaskSettledV2 {
            task_id: TaskId,
            buyer: T::AccountId,
            seller: T::AccountId,
            bond_funder: Option<T::AccountId>,
            buyer_escrow_payout: T::Balance,
            buyer_bond_payout: T::Balance,
            seller_escrow_payout: T::Balance,
            seller_bond_refund: T::Balance,
            path: SettlementPath,
        },
        /// A stale dispute was settled permissionlessly.
        PostDisputeTimeoutSettled {
            task_id: TaskId,
            deadline: u64,
            outcome: DisputeOutcome,
        },
        /// The buyer cancelled after the delivery window lapsed, claiming the
        /// bond.
        TaskCancelledForNonDelivery {
            task_id: TaskId,
            escrow_refund: T::Balance,
            seller_bond_penalty: T::Balance,
        },
        /// A dispute-module swap was scheduled.
        DisputeModuleUpdateScheduled {
            previous: T::AccountId,
            pending: T::AccountId,
            execute_after: u64,
        },
        /// A scheduled dispute-module swap was cancelled.
        DisputeModuleUpdateCancelled { pending: T::AccountId },
        /// The dispute module changed.
        DisputeModuleUpdated {
            previous: Option<T::AccountId>,
            new: T::AccountId,
        },
        /// An admin handover was proposed.
        AdminTransferStarted {
            current: T::AccountId,
            pending: T::AccountId,
        },
        /// The admin handover completed.
        AdminTransferred {
            previous: T::AccountId,
            new: T::AccountId,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Task ID not found.
        TaskNotFound,
        /// The referenced listing does not exist.
        ListingNotFound,
        /// The referenced listing is not active.
        ListingNotActive,
        /// Units fall outside the listing's `[min_units, max_units]`.
        UnitsOutOfRange,
        /// The URI exceeds the maximum allowed length.
        UriTooLong,
        /// The listing requires an explicit quote.
        QuoteRequired,
        /// Only the task buyer can perform this action.
        NotBuyer,
        /// Only the snapshotted seller can perform this action.
        NotSeller,
        /// Caller fails the agent-identity authorization check.
        NotAgentAuthorized,
        /// The task's agent no longer resolves to an owner.
        AgentNotFound,
        /// Task is not in the status this transition requires.
        InvalidTaskStatus,
        /// Escrow has already been funded.
        AlreadyFunded,
        /// Escrow has not been funded.
        NotFunded,
        /// The listing policy requires no bond.
        BondNotRequired,
        /// The bond has already been deposited.
        BondAlreadyFunded,
        /// The required bond has not been deposited yet.
        BondNotFunded,
        /// Bond deposit must equal the required bond exactly.
        BondAmountMismatch,
        /// Escrow deposit must equal the quoted total exactly.
        AmountMismatch,
        /// The quote's funding deadline has passed.
        QuoteExpired,
        /// The challenge window is still open.
        ChallengeWindowOpen,
        /// The challenge window has closed.
        ChallengeWindowClosed,
        /// The delivery window is still open.
        DeliveryWindowOpen,
        /// The delivery window has closed.
        DeliveryWindowClosed,
        /// The listing policy disables post-dispute timeout settlement.
        PostDisputeWindowDisabled,
        /// The post-dispute window is still open.
        PostDisputeWindowOpen,
        /// No dispute module is installed.
        DisputeModuleNotSet,
        /// Only the installed dispute module can perform this action.
        NotDisputeModule,
        /// The proposed module equals the installed one.
        SameDisputeModule,
        /// No dispute-module swap is scheduled.
        NoPendingUpdate,
        /// The scheduled swap's timelock has not elapsed.
        UpdateNotReady,
        /// Only the market admin can perform this action.
        NotAdmin,
        /// Only the proposed admin can accept the handover.
        NotPendingAdmin,
        /// The custody pool did not grow by the requested deposit.
        DepositDeltaMismatch,
        /// A payout would exceed its source pool.
        PayoutExceedsEscrow,
        /// The task has no seller snapshot.
        MissingSeller,
        /// A bond refund has no recorded funder.
        MissingBondFunder,
        /// The task already settled.
        AlreadySettled,
        /// Arithmetic overflow in settlement accounting.
        ArithmeticOverflow,
        /// Recursive entry into a custody-moving call.
        ReentrantCall,
    }

    // =========================================================
    // Weight trait
    // =========================================================

    pub trait WeightInfo {
        fn post_task() -> Weight;
        fn propose_quote() -> Weight;
        fn accept_task() -> Weight;
        fn fund_seller_bond() -> Weight;
        fn fund_task() -> Weight;
        fn accept_quote() -> Weight;
        fn seller_cancel_quote() -> Weight;
        fn cancel_task() -> Weight;
        fn submit_deliverable() -> Weight;
        fn accept_submission() -> Weight;
        fn settle_after_timeout() -> Weight;
        fn dispute_submission() -> Weight;
        fn mark_disputed() -> Weight;
        fn resolve_dispute() -> Weight;
        fn settle_after_post_dispute_timeout() -> Weight;
        fn cancel_for_non_delivery() -> Weight;
        fn set_dispute_module() -> Weight;
        fn cancel_dispute_module_update() -> Weight;
        fn execute_dispute_module_update() -> Weight;
        fn propose_admin() -> Weight;
        fn accept_admin() -> Weight;
    }

    pub struct SubstrateWeight<T>(core::marker::PhantomData<T>);

    impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
        fn post_task() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn propose_quote() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn accept_task() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn fund_seller_bond() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn fund_task() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn accept_quote() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn seller_cancel_quote() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn cancel_task() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn submit_deliverable() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn accept_submission() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn settle_after_timeout() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn dispute_submission() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn mark_disputed() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn resolve_dispute() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn settle_after_post_dispute_timeout() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn cancel_for_non_delivery() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn set_dispute_module() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn cancel_dispute_module_update() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn execute_dispute_module_update() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn propose_admin() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn accept_admin() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Post a task against an active listing.
        ///
        /// Snapshots the listing's agent id and payment asset; the caller
        /// becomes the buyer.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::post_task())]
        pub fn post_task(
            origin: OriginFor<T>,
            listing_id: ListingId,
            task_uri: Vec<u8>,
            proposed_units: u32,
        ) -> DispatchResult {
            let buyer = ensure_signed(origin)?;

            let terms = Self::listing_terms(listing_id)?;
            ensure!(terms.active, Error::<T>::ListingNotActive);
            ensure!(
                proposed_units >= terms.pricing.min_units
                    && proposed_units <= terms.pricing.max_units,
                Error::<T>::UnitsOutOfRange
            );

            let bounded_uri: BoundedVec<u8, T::MaxUriLength> = task_uri
                .clone()
                .try_into()
                .map_err(|_| Error::<T>::UriTooLong)?;

            let task_id = TaskCount::<T>::get().saturating_add(1);
            let agent_id = terms.agent_id;

            Tasks::<T>::insert(
                task_id,
                Task::<T> {
                    listing_id,
                    agent_id,
                    buyer: buyer.clone(),
                    payment_token: terms.pricing.payment_token,
                    task_uri: bounded_uri,
                    proposed_units,
                    quoted_units: 0,
                    quoted_total_price: Zero::zero(),
                    quote_expiry: 0,
                    funded_amount: Zero::zero(),
                    escrow_funded: false,
                    seller_bond: Zero::zero(),
                    bond_funder: None,
                    seller: None,
                    artifact_uri: BoundedVec::new(),
                    artifact_hash: H256::zero(),
                    activated_at: 0,
                    submitted_at: 0,
                    disputed_at: 0,
                    status: TaskStatus::Open,
                    settled: false,
                },
            );
            TaskCount::<T>::put(task_id);

            Self::deposit_event(Event::TaskPosted {
                task_id,
                listing_id,
                agent_id,
                buyer,
                task_uri,
                proposed_units,
            });

            Ok(())
        }

        /// Propose a quote for an open task.
        ///
        /// The caller must pass the agent-identity authorization check for the
        /// task's agent. `quote_expiry` of 0 means the quote never expires.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::propose_quote())]
        pub fn propose_quote(
            origin: OriginFor<T>,
            task_id: TaskId,
            quoted_units: u32,
            quoted_total_price: T::Balance,
            quote_expiry: u64,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Tasks::<T>::try_mutate(task_id, |maybe_task| -> DispatchResult {
                let task = maybe_task.as_mut().ok_or(Error::<T>::TaskNotFound)?;
                ensure!(
                    task.status == TaskStatus::Open,
                    Error::<T>::InvalidTaskStatus
                );

                let terms = Self::listing_terms(task.listing_id)?;
                ensure!(terms.active, Error::<T>::ListingNotActive);
                Self::ensure_agent_authorized(task.agent_id, &who)?;
                ensure!(
                    quoted_units >= terms.pricing.min_units
                        && quoted_units <= terms.pricing.max_units,
                    Error::<T>::UnitsOutOfRange
                );

                task.quoted_units = quoted_units;
                task.quoted_total_price = quoted_total_price;
                task.quote_expiry = quote_expiry;
                task.status = TaskStatus::Quoted;

                Ok(())
            })?;

            Self::deposit_event(Event::QuoteProposed {
                task_id,
                quoted_units,
                quoted_total_price,
                expiry: quote_expiry,
            });

            Ok(())
        }

        /// Accept an open task at listing pricing (implicit quote).
        ///
        /// Only valid when the listing does not require an explicit quote;
        /// the total is `base_price + proposed_units * unit_price`.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::accept_task())]
        pub fn accept_task(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let (quoted_units, quoted_total_price) =
                Tasks::<T>::try_mutate(task_id, |maybe_task| {
                    let task = maybe_task.as_mut().ok_or(Error::<T>::TaskNotFound)?;
                    ensure!(
                        task.status == TaskStatus::Open,
                        Error::<T>::InvalidTaskStatus
                    );

                    let terms = Self::listing_terms(task.listing_id)?;
                    ensure!(terms.active, Error::<T>::ListingNotActive);
                    ensure!(!terms.pricing.quote_required, Error::<T>::QuoteRequired);
                    Self::ensure_agent_authorized(task.agent_id, &who)?;

                    let unit_total = terms
                        .pricing
                        .unit_price
                        .checked_mul(&task.proposed_units.into())
                        .ok_or(Error::<T>::ArithmeticOverflow)?;
                    let total = terms
                        .pricing
                        .base_price
                        .checked_add(&unit_total)
                        .ok_or(Error::<T>::ArithmeticOverflow)?;

                    task.quoted_units = task.proposed_units;
                    task.quoted_total_price = total;
                    task.quote_expiry = 0;
                    task.status = TaskStatus::Quoted;

                    Ok::<(u32, T::Balance), DispatchError>((task.quoted_units, total))
                })?;

            Self::deposit_event(Event::TaskAccepted {
                task_id,
                quoted_units,
                quoted_total_price,
            });

            Ok(())
        }

        /// Deposit the seller bond required by the listing policy.
        ///
        /// The caller becomes the bond funder and receives any bond refund,
        /// regardless of later agent transfers.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::fund_seller_bond())]
        pub fn fund_seller_bond(
            origin: OriginFor<T>,
            task_id: TaskId,
            amount: T::Balance,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(
                    task.status == TaskStatus::Quoted,
                    Error::<T>::InvalidTaskStatus
                );
                Self::ensure_agent_authorized(task.agent_id, &who)?;

                let terms = Self::listing_terms(task.listing_id)?;
                let required =
                    Self::required_bond(task.quoted_total_price, terms.policy.seller_bond_bps)?;
                ensure!(!required.is_zero(), Error::<T>::BondNotRequired);
                ensure!(task.bond_funder.is_none(), Error::<T>::BondAlreadyFunded);
                ensure!(amount == required, Error::<T>::BondAmountMismatch);

                Self::pull_exact(task.payment_token, &who, amount)?;

                task.seller_bond = amount;
                task.bond_funder = Some(who);
                Tasks::<T>::insert(task_id, &task);

                Self::deposit_event(Event::SellerBondFunded { task_id, amount });

                Ok(())
            })
        }

        /// Fund the task's escrow with exactly the quoted total.
        ///
        /// Requires any seller bond to be in place first, and the quote not to
        /// have expired. Funding at `now == quote_expiry` succeeds.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::fund_task())]
        pub fn fund_task(
            origin: OriginFor<T>,
            task_id: TaskId,
            amount: T::Balance,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(task.buyer == who, Error::<T>::NotBuyer);
                ensure!(
                    task.status == TaskStatus::Quoted,
                    Error::<T>::InvalidTaskStatus
                );
                ensure!(!task.escrow_funded, Error::<T>::AlreadyFunded);
                ensure!(amount == task.quoted_total_price, Error::<T>::AmountMismatch);

                let terms = Self::listing_terms(task.listing_id)?;
                let required =
                    Self::required_bond(task.quoted_total_price, terms.policy.seller_bond_bps)?;
                if !required.is_zero() {
                    ensure!(task.bond_funder.is_some(), Error::<T>::BondNotFunded);
                }
                if task.quote_expiry != 0 {
                    ensure!(Self::now() <= task.quote_expiry, Error::<T>::QuoteExpired);
                }

                Self::pull_exact(task.payment_token, &who, amount)?;

                task.funded_amount = amount;
                task.escrow_funded = true;
                Tasks::<T>::insert(task_id, &task);

                Self::deposit_event(Event::TaskFunded { task_id, amount });

                Ok(())
            })
        }

        /// Accept the quote and activate the task.
        ///
        /// Snapshots the current agent owner as the task's seller. The
        /// snapshot, not agent ownership, controls every later seller action.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::accept_quote())]
        pub fn accept_quote(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Tasks::<T>::try_mutate(task_id, |maybe_task| -> DispatchResult {
                let task = maybe_task.as_mut().ok_or(Error::<T>::TaskNotFound)?;
                ensure!(task.buyer == who, Error::<T>::NotBuyer);
                ensure!(
                    task.status == TaskStatus::Quoted,
                    Error::<T>::InvalidTaskStatus
                );
                ensure!(task.escrow_funded, Error::<T>::NotFunded);

                let terms = Self::listing_terms(task.listing_id)?;
                let required =
                    Self::required_bond(task.quoted_total_price, terms.policy.seller_bond_bps)?;
                if !required.is_zero() {
                    ensure!(task.bond_funder.is_some(), Error::<T>::BondNotFunded);
                }

                let seller =
                    T::AgentIdentity::owner_of(task.agent_id).ok_or(Error::<T>::AgentNotFound)?;

                task.seller = Some(seller);
                task.activated_at = Self::now();
                task.status = TaskStatus::Active;

                Ok(())
            })?;

            Self::deposit_event(Event::QuoteAccepted { task_id });

            Ok(())
        }

        /// Withdraw a quote that has not been funded.
        ///
        /// Refunds any bond to its funder and clears the quote fields.
        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::seller_cancel_quote())]
        pub fn seller_cancel_quote(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(
                    task.status == TaskStatus::Quoted,
                    Error::<T>::InvalidTaskStatus
                );
                Self::ensure_agent_authorized(task.agent_id, &who)?;
                ensure!(!task.escrow_funded, Error::<T>::AlreadyFunded);

                let bond_refund = task.seller_bond;
                let bond_funder = task.bond_funder.take();
                let asset = task.payment_token;

                task.quoted_units = 0;
                task.quoted_total_price = Zero::zero();
                task.quote_expiry = 0;
                task.seller_bond = Zero::zero();
                task.status = TaskStatus::Cancelled;
                Tasks::<T>::insert(task_id, &task);

                if !bond_refund.is_zero() {
                    let funder = bond_funder.ok_or(Error::<T>::MissingBondFunder)?;
                    Self::pay_out(asset, &funder, bond_refund)?;
                }

                Self::deposit_event(Event::SellerCancelledQuote {
                    task_id,
                    bond_refund,
                });

                Ok(())
            })
        }

        /// Cancel a task that has not been activated.
        ///
        /// Refunds escrow to the buyer and any bond to its funder in full.
        #[pallet::call_index(7)]
        #[pallet::weight(T::WeightInfo::cancel_task())]
        pub fn cancel_task(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(task.buyer == who, Error::<T>::NotBuyer);
                ensure!(
                    matches!(task.status, TaskStatus::Open | TaskStatus::Quoted),
                    Error::<T>::InvalidTaskStatus
                );

                let escrow_refund = task.funded_amount;
                let bond_refund = task.seller_bond;
                let bond_funder = task.bond_funder.clone();
                let asset = task.payment_token;

                task.status = TaskStatus::Cancelled;
                Tasks::<T>::insert(task_id, &task);

                Self::pay_out(asset, &who, escrow_refund)?;
                if !bond_refund.is_zero() {
                    let funder = bond_funder.ok_or(Error::<T>::MissingBondFunder)?;
                    Self::pay_out(asset, &funder, bond_refund)?;
                }

                Self::deposit_event(Event::TaskCancelled { task_id });

                Ok(())
            })
        }

        /// Submit the deliverable for an active task.
        ///
        /// Only the seller snapshotted at quote acceptance may submit, and
        /// only strictly inside the delivery window.
        #[pallet::call_index(8)]
        #[pallet::weight(T::WeightInfo::submit_deliverable())]
        pub fn submit_deliverable(
            origin: OriginFor<T>,
            task_id: TaskId,
            artifact_uri: Vec<u8>,
            artifact_hash: H256,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Tasks::<T>::try_mutate(task_id, |maybe_task| -> DispatchResult {
                let task = maybe_task.as_mut().ok_or(Error::<T>::TaskNotFound)?;
                ensure!(
                    task.status == TaskStatus::Active,
                    Error::<T>::InvalidTaskStatus
                );
                ensure!(task.seller.as_ref() == Some(&who), Error::<T>::NotSeller);
                ensure!(task.escrow_funded, Error::<T>::NotFunded);

                let terms = Self::listing_terms(task.listing_id)?;
                let deadline = task
                    .activated_at
                    .saturating_add(terms.policy.delivery_window_secs);
                ensure!(Self::now() < deadline, Error::<T>::DeliveryWindowClosed);

                task.artifact_uri = artifact_uri
                    .clone()
                    .try_into()
                    .map_err(|_| Error::<T>::UriTooLong)?;
                task.artifact_hash = artifact_hash;
                task.submitted_at = Self::now();
                task.status = TaskStatus::Submitted;

                Ok(())
            })?;

            Self::deposit_event(Event::DeliverableSubmitted {
                task_id,
                artifact_uri,
                artifact_hash,
            });

            Ok(())
        }

        /// Accept the submission and settle on the accepted path.
        #[pallet::call_index(9)]
        #[pallet::weight(T::WeightInfo::accept_submission())]
        pub fn accept_submission(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
            ensure!(task.buyer == who, Error::<T>::NotBuyer);
            ensure!(
                task.status == TaskStatus::Submitted,
                Error::<T>::InvalidTaskStatus
            );

            Self::deposit_event(Event::SubmissionAccepted { task_id });
            Self::settle_task(task_id, SettlementPath::Accepted)
        }

        /// Settle a submitted task after the challenge window lapses.
        ///
        /// Open to any caller so custody cannot strand when the buyer goes
        /// silent. Succeeds exactly at the window boundary.
        #[pallet::call_index(10)]
        #[pallet::weight(T::WeightInfo::settle_after_timeout())]
        pub fn settle_after_timeout(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            ensure_signed(origin)?;

            let task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
            ensure!(
                task.status == TaskStatus::Submitted,
                Error::<T>::InvalidTaskStatus
            );

            let terms = Self::listing_terms(task.listing_id)?;
            let deadline = task
                .submitted_at
                .saturating_add(terms.policy.challenge_window_secs);
            ensure!(Self::now() >= deadline, Error::<T>::ChallengeWindowOpen);

            Self::settle_task(task_id, SettlementPath::Timeout)
        }

        /// Open a dispute through the installed dispute module.
        ///
        /// The module records the dispute and calls back `mark_disputed`.
        #[pallet::call_index(11)]
        #[pallet::weight(T::WeightInfo::dispute_submission())]
        pub fn dispute_submission(
            origin: OriginFor<T>,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
            ensure!(task.buyer == who, Error::<T>::NotBuyer);
            ensure!(
                task.status == TaskStatus::Submitted,
                Error::<T>::InvalidTaskStatus
            );
            ensure!(
                DisputeModule::<T>::get().is_some(),
                Error::<T>::DisputeModuleNotSet
            );

            let terms = Self::listing_terms(task.listing_id)?;
            let deadline = task
                .submitted_at
                .saturating_add(terms.policy.challenge_window_secs);
            ensure!(Self::now() < deadline, Error::<T>::ChallengeWindowClosed);

            T::DisputeRouter::open_dispute(task_id, &who, dispute_uri)
        }

        /// Move a submitted task to `Disputed` (dispute module only).
        #[pallet::call_index(12)]
        #[pallet::weight(T::WeightInfo::mark_disputed())]
        pub fn mark_disputed(
            origin: OriginFor<T>,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_mark_disputed(&who, task_id, dispute_uri)
        }

        /// Settle a disputed task with the supplied outcome (dispute module
        /// only).
        #[pallet::call_index(13)]
        #[pallet::weight(T::WeightInfo::resolve_dispute())]
        pub fn resolve_dispute(
            origin: OriginFor<T>,
            task_id: TaskId,
            outcome: DisputeOutcome,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_resolve_dispute(&who, task_id, outcome)
        }

        /// Settle a disputed task seller-wins after the post-dispute window
        /// lapses without resolution. Open to any caller; requires the listing
        /// policy to enable the window.
        #[pallet::call_index(14)]
        #[pallet::weight(T::WeightInfo::settle_after_post_dispute_timeout())]
        pub fn settle_after_post_dispute_timeout(
            origin: OriginFor<T>,
            task_id: TaskId,
        ) -> DispatchResult {
            ensure_signed(origin)?;

            let task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
            ensure!(
                task.status == TaskStatus::Disputed,
                Error::<T>::InvalidTaskStatus
            );

            let terms = Self::listing_terms(task.listing_id)?;
            ensure!(
                terms.policy.post_dispute_window_secs > 0,
                Error::<T>::PostDisputeWindowDisabled
            );
            let deadline = task
                .disputed_at
                .saturating_add(terms.policy.post_dispute_window_secs);
            ensure!(Self::now() >= deadline, Error::<T>::PostDisputeWindowOpen);

            Self::deposit_event(Event::PostDisputeTimeoutSettled {
                task_id,
                deadline,
                outcome: DisputeOutcome::SellerWins,
            });
            Self::settle_task(task_id, SettlementPath::PostDisputeTimeout)
        }

        /// Cancel an active task whose delivery window lapsed with no
        /// submission. The buyer receives escrow plus the seller bond.
        #[pallet::call_index(15)]
        #[pallet::weight(T::WeightInfo::cancel_for_non_delivery())]
        pub fn cancel_for_non_delivery(origin: OriginFor<T>, task_id: TaskId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(task.buyer == who, Error::<T>::NotBuyer);
                ensure!(
                    task.status == TaskStatus::Active,
                    Error::<T>::InvalidTaskStatus
                );
                ensure!(task.escrow_funded, Error::<T>::NotFunded);

                let terms = Self::listing_terms(task.listing_id)?;
                let deadline = task
                    .activated_at
                    .saturating_add(terms.policy.delivery_window_secs);
                ensure!(Self::now() >= deadline, Error::<T>::DeliveryWindowOpen);

                let escrow_refund = task.funded_amount;
                let seller_bond_penalty = task.seller_bond;
                let asset = task.payment_token;
                let payout = escrow_refund
                    .checked_add(&seller_bond_penalty)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;

                task.status = TaskStatus::Cancelled;
                task.settled = true;
                Tasks::<T>::insert(task_id, &task);

                Self::pay_out(asset, &who, payout)?;

                Self::deposit_event(Event::TaskCancelledForNonDelivery {
                    task_id,
                    escrow_refund,
                    seller_bond_penalty,
                });

                Ok(())
            })
        }

        /// Install or schedule a dispute module (admin only).
        ///
        /// Installs immediately when no module is set; otherwise schedules the
        /// swap behind the update delay.
        #[pallet::call_index(16)]
        #[pallet::weight(T::WeightInfo::set_dispute_module())]
        pub fn set_dispute_module(origin: OriginFor<T>, module: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_admin(&who)?;

            match DisputeModule::<T>::get() {
                None => {
                    DisputeModule::<T>::put(&module);
                    Self::deposit_event(Event::DisputeModuleUpdated {
                        previous: None,
                        new: module,
                    });
                }
                Some(previous) => {
                    ensure!(previous != module, Error::<T>::SameDisputeModule);
                    let execute_after =
                        Self::now().saturating_add(T::DisputeModuleUpdateDelay::get());
                    PendingDisputeModule::<T>::put(PendingModuleUpdate::<T> {
                        module: module.clone(),
                        execute_after,
                    });
                    Self::deposit_event(Event::DisputeModuleUpdateScheduled {
                        previous,
                        pending: module,
                        execute_after,
                    });
                }
            }

            Ok(())
        }

        /// Wipe a scheduled dispute-module swap (admin only).
        #[pallet::call_index(17)]
        #[pallet::weight(T::WeightInfo::cancel_dispute_module_update())]
        pub fn cancel_dispute_module_update(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_admin(&who)?;

            let pending = PendingDisputeModule::<T>::take().ok_or(Error::<T>::NoPendingUpdate)?;

            Self::deposit_event(Event::DisputeModuleUpdateCancelled {
                pending: pending.module,
            });

            Ok(())
        }

        /// Execute a scheduled dispute-module swap once its timelock elapsed
        /// (admin only).
        #[pallet::call_index(18)]
        #[pallet::weight(T::WeightInfo::execute_dispute_module_update())]
        pub fn execute_dispute_module_update(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_admin(&who)?;

            let pending = PendingDisputeModule::<T>::get().ok_or(Error::<T>::NoPendingUpdate)?;
            ensure!(
                Self::now() >= pending.execute_after,
                Error::<T>::UpdateNotReady
            );

            let previous = DisputeModule::<T>::get();
            DisputeModule::<T>::put(&pending.module);
            PendingDisputeModule::<T>::kill();

            Self::deposit_event(Event::DisputeModuleUpdated {
                previous,
                new: pending.module,
            });

            Ok(())
        }

        /// Propose a new admin (admin only). Takes effect when accepted.
        #[pallet::call_index(19)]
        #[pallet::weight(T::WeightInfo::propose_admin())]
        pub fn propose_admin(origin: OriginFor<T>, new_admin: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_admin(&who)?;

            PendingAdmin::<T>::put(&new_admin);

            Self::deposit_event(Event::AdminTransferStarted {
                current: who,
                pending: new_admin,
            });

            Ok(())
        }

        /// Accept a proposed admin handover.
        #[pallet::call_index(20)]
        #[pallet::weight(T::WeightInfo::accept_admin())]
        pub fn accept_admin(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let pending = PendingAdmin::<T>::get().ok_or(Error::<T>::NotPendingAdmin)?;
            ensure!(pending == who, Error::<T>::NotPendingAdmin);

            let previous = Admin::<T>::get().ok_or(Error::<T>::NotAdmin)?;
            Admin::<T>::put(&who);
            PendingAdmin::<T>::kill();

            Self::deposit_event(Event::AdminTransferred {
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
        /// Sovereign account holding all escrow and bond custody.
        pub fn custody_account() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        /// Current wall-clock time in whole unix seconds.
        pub fn now() -> u64 {
            T::TimeProvider::now().as_secs()
        }

        fn listing_terms(listing_id: ListingId) -> Result<ListingTerms<T::Balance>, Error<T>> {
            T::Listings::listing_terms(listing_id).ok_or(Error::<T>::ListingNotFound)
        }

        fn ensure_agent_authorized(agent_id: AgentId, who: &T::AccountId) -> DispatchResult {
            ensure!(
                T::AgentIdentity::is_authorized(agent_id, who),
                Error::<T>::NotAgentAuthorized
            );
            Ok(())
        }

        fn ensure_admin(who: &T::AccountId) -> DispatchResult {
            ensure!(
                Admin::<T>::get().as_ref() == Some(who),
                Error::<T>::NotAdmin
            );
            Ok(())
        }

        /// `floor(total * bond_bps / 10000)`.
        fn required_bond(total: T::Balance, bond_bps: u32) -> Result<T::Balance, Error<T>> {
            let numerator = total
                .checked_mul(&bond_bps.into())
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            Ok(numerator / BPS_DENOMINATOR.into())
        }

        fn with_custody_lock(f: impl FnOnce() -> DispatchResult) -> DispatchResult {
            ensure!(!CustodyLock::<T>::get(), Error::<T>::ReentrantCall);
            CustodyLock::<T>::put(true);
            let result = f();
            CustodyLock::<T>::kill();
            result
        }

        /// Pull exactly `amount` from `from` into custody and verify the pool
        /// grew by the full amount. The delta check is the single place
        /// fee-on-transfer assets are rejected.
        fn pull_exact(asset: AssetId, from: &T::AccountId, amount: T::Balance) -> DispatchResult {
            let custody = Self::custody_account();
            let before = T::Assets::balance_of(asset, &custody);
            T::Assets::transfer_from(asset, &custody, from, &custody, amount)?;
            let after = T::Assets::balance_of(asset, &custody);
            ensure!(
                after.saturating_sub(before) == amount,
                Error::<T>::DepositDeltaMismatch
            );
            Ok(())
        }

        /// Pay `amount` out of custody, skipping zero-amount transfers.
        fn pay_out(asset: AssetId, to: &T::AccountId, amount: T::Balance) -> DispatchResult {
            if amount.is_zero() {
                return Ok(());
            }
            T::Assets::transfer(asset, &Self::custody_account(), to, amount)
        }

        pub(crate) fn do_mark_disputed(
            caller: &T::AccountId,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            ensure!(
                DisputeModule::<T>::get().as_ref() == Some(caller),
                Error::<T>::NotDisputeModule
            );

            Tasks::<T>::try_mutate(task_id, |maybe_task| -> DispatchResult {
                let task = maybe_task.as_mut().ok_or(Error::<T>::TaskNotFound)?;
                ensure!(
                    task.status == TaskStatus::Submitted,
                    Error::<T>::InvalidTaskStatus
                );

                task.disputed_at = Self::now();
                task.status = TaskStatus::Disputed;

                Ok(())
            })?;

            Self::deposit_event(Event::SubmissionDisputed {
                task_id,
                dispute_uri,
            });

            Ok(())
        }

        pub(crate) fn do_resolve_dispute(
            caller: &T::AccountId,
            task_id: TaskId,
            outcome: DisputeOutcome,
        ) -> DispatchResult {
            ensure!(
                DisputeModule::<T>::get().as_ref() == Some(caller),
                Error::<T>::NotDisputeModule
            );

            let task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
            ensure!(
                task.status == TaskStatus::Disputed,
                Error::<T>::InvalidTaskStatus
            );

            let path = match outcome {
                DisputeOutcome::SellerWins => SettlementPath::DisputeSellerWins,
                DisputeOutcome::BuyerWins => SettlementPath::DisputeBuyerWins,
                DisputeOutcome::Split => SettlementPath::DisputeSplit,
                DisputeOutcome::Cancel => SettlementPath::DisputeCancel,
            };

            Self::settle_task(task_id, path)
        }

        /// Terminal payout. Status flips to Settled before any transfer;
        /// payout order is buyer, seller, bond funder. Floor-division residue
        /// of the split path accrues to the seller.
        fn settle_task(task_id: TaskId, path: SettlementPath) -> DispatchResult {
            Self::with_custody_lock(|| {
                let mut task = Tasks::<T>::get(task_id).ok_or(Error::<T>::TaskNotFound)?;
                ensure!(!task.settled, Error::<T>::AlreadySettled);

                let funded = task.funded_amount;
                let bond = task.seller_bond;

                let (buyer_escrow_payout, buyer_bond_payout) = match path {
                    SettlementPath::DisputeBuyerWins => (funded, bond),
                    SettlementPath::DisputeSplit => (funded / 2u32.into(), Zero::zero()),
                    SettlementPath::DisputeCancel => (funded, Zero::zero()),
                    SettlementPath::Accepted
                    | SettlementPath::Timeout
                    | SettlementPath::PostDisputeTimeout
                    | SettlementPath::DisputeSellerWins => (Zero::zero(), Zero::zero()),
                };

                let seller_escrow_payout = funded
                    .checked_sub(&buyer_escrow_payout)
                    .ok_or(Error::<T>::PayoutExceedsEscrow)?;
                let seller_bond_refund = bond
                    .checked_sub(&buyer_bond_payout)
                    .ok_or(Error::<T>::PayoutExceedsEscrow)?;
                let buyer_payout = buyer_escrow_payout
                    .checked_add(&buyer_bond_payout)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;

                let buyer = task.buyer.clone();
                let seller = task.seller.clone().ok_or(Error::<T>::MissingSeller)?;
                let bond_funder = task.bond_funder.clone();
                let asset = task.payment_token;

                task.status = TaskStatus::Settled;
                task.settled = true;
                Tasks::<T>::insert(task_id, &task);

                Self::pay_out(asset, &buyer, buyer_payout)?;
                Self::pay_out(asset, &seller, seller_escrow_payout)?;
                if !seller_bond_refund.is_zero() {
                    let funder = bond_funder.clone().ok_or(Error::<T>::MissingBondFunder)?;
                    Self::pay_out(asset, &funder, seller_bond_refund)?;
                }

                Self::deposit_event(Event::TaskSettled {
                    task_id,
                    buyer_payout,
                    seller_bond_refund,
                });
                Self::deposit_event(Event::TaskSettledV2 {
                    task_id,
                    buyer,
                    seller,
                    bond_funder,
                    buyer_escrow_payout,
                    buyer_bond_payout,
                    seller_escrow_payout,
                    seller_bond_refund,
                    path,
                });

                Ok(())
            })
        }
    }

    impl<T: Config> TaskMarketInterface<T::AccountId> for Pallet<T> {
        fn submission_view(task_id: TaskId) -> Option<SubmissionView<T::AccountId>> {
            let task = Tasks::<T>::get(task_id)?;
            let terms = T::Listings::listing_terms(task.listing_id)?;
            Some(SubmissionView {
                buyer: task.buyer,
                status: task.status,
                submitted_at: task.submitted_at,
                challenge_window_secs: terms.policy.challenge_window_secs,
            })
        }

        fn mark_disputed(
            caller: &T::AccountId,
            task_id: TaskId,
            dispute_uri: Vec<u8>,
        ) -> DispatchResult {
            Self::do_mark_disputed(caller, task_id, dispute_uri)
        }

        fn resolve_dispute(
            caller: &T::AccountId,
            task_id: TaskId,
            outcome: DisputeOutcome,
        ) -> DispatchResult {
            Self::do_resolve_dispute(caller, task_id, outcome)
        }
    }
}
