//! # Listing Registry Pallet
//!
//! Per-agent service listings with immutable pricing and settlement policy.
//!
//! ## Overview
//!
//! A listing binds an agent to a price schedule (payment asset, base price,
//! per-unit price, unit bounds, quote mode) and a settlement policy (challenge
//! window, post-dispute window, delivery window, seller bond). Pricing and
//! policy are fixed at creation; only the listing URI and the active flag can
//! change afterwards, and only through a caller that passes the agent-identity
//! authorization check for the bound agent. The agent binding itself never
//! changes.
//!
//! The task market reads listings through [`ListingRegistryInterface`]; it
//! never mutates them.
//!
//! ## Interface
//!
//! ### Dispatchable Functions
//!
//! - `create_listing` - Create a listing for an agent (agent-authorized)
//! - `update_listing` - Replace the listing URI and active flag

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(test)]
mod tests;

use alloc::vec::Vec;
use codec::{Decode, Encode, MaxEncodedLen};
use frame_support::pallet_prelude::RuntimeDebug;
use pallet_agent_identity::AgentId;
use pallet_payment_assets::AssetId;
use scale_info::TypeInfo;

/// Type alias for listing IDs (sequential, non-zero).
pub type ListingId = u64;

/// Basis-point denominator for the seller bond rate.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Immutable price schedule for a listing.
#[derive(
    Clone,
    Encode,
    Decode,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
    MaxEncodedLen,
    codec::DecodeWithMemTracking,
)]
pub struct Pricing<Balance> {
    /// Asset every task under this listing pays in.
    pub payment_token: AssetId,
    /// Flat price component.
    pub base_price: Balance,
    /// Opaque 32-byte label for the unit of work.
    pub unit_type: [u8; 32],
    /// Price per unit of work.
    pub unit_price: Balance,
    /// Minimum units per task (at least 1).
    pub min_units: u32,
    /// Maximum units per task.
    pub max_units: u32,
    /// Whether the agent must quote explicitly before funding.
    pub quote_required: bool,
}

/// Immutable settlement policy for a listing.
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
pub struct ListingPolicy {
    /// Seconds after submission during which the buyer may dispute.
    pub challenge_window_secs: u64,
    /// Seconds after dispute opening after which anyone may settle seller-wins.
    /// Zero disables the path.
    pub post_dispute_window_secs: u64,
    /// Seconds after activation within which the seller must submit.
    pub delivery_window_secs: u64,
    /// Seller bond rate in basis points (0-10000) of the quoted total.
    pub seller_bond_bps: u32,
}

/// A listing as seen by the task market.
#[derive(Clone, Eq, PartialEq, RuntimeDebug)]
pub struct ListingTerms<Balance> {
    pub agent_id: AgentId,
    pub pricing: Pricing<Balance>,
    pub policy: ListingPolicy,
    pub active: bool,
}

/// Read interface to the listing registry.
pub trait ListingRegistryInterface<Balance> {
    /// The pricing/policy tuple for a listing, if it exists.
    fn listing_terms(listing_id: ListingId) -> Option<ListingTerms<Balance>>;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;
    use pallet_agent_identity::AgentIdentityInterface;
    use pallet_payment_assets::PaymentAssets;
    use sp_runtime::traits::AtLeast32BitUnsigned;

    /// A listing stored on-chain.
    #[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct Listing<T: Config> {
        /// The agent this listing is bound to. Never changes.
        pub agent_id: AgentId,
        /// Opaque listing URI.
        pub uri: BoundedVec<u8, T::MaxUriLength>,
        /// Immutable price schedule.
        pub pricing: Pricing<T::Balance>,
        /// Immutable settlement policy.
        pub policy: ListingPolicy,
        /// Whether new tasks and quotes may reference this listing.
        pub active: bool,
        /// Block number when the listing was created.
        pub created_at: BlockNumberFor<T>,
    }

    impl<T: Config> codec::DecodeWithMemTracking for Listing<T> {}

    /// The pallet's configuration trait.
    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching runtime event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;

        /// Unit of account for listing prices.
        type Balance: Parameter
            + Member
            + AtLeast32BitUnsigned
            + Copy
            + Default
            + MaxEncodedLen;

        /// Payment ledger used to validate the declared payment asset.
        type Assets: PaymentAssets<Self::AccountId, Self::Balance>;

        /// Agent identity for authorization checks.
        type AgentIdentity: AgentIdentityInterface<Self::AccountId>;

        /// Maximum byte length of a listing URI.
        #[pallet::constant]
        type MaxUriLength: Get<u32>;

        /// Maximum number of listings indexed per agent.
        #[pallet::constant]
        type MaxListingsPerAgent: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type Listings<T: Config> =
        StorageMap<_, Blake2_128Concat, ListingId, Listing<T>, OptionQuery>;

    /// Total number of listings created. Listing ids are `1..=ListingCount`.
    #[pallet::storage]
    pub type ListingCount<T: Config> = StorageValue<_, u64, ValueQuery>;

    #[pallet::storage]
    pub type AgentListings<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        AgentId,
        BoundedVec<ListingId, T::MaxListingsPerAgent>,
        ValueQuery,
    >;

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A new listing was created.
        ListingCreated {
            listing_id: ListingId,
            agent_id: AgentId,
            payment_token: AssetId,
        },
        /// A listing's URI or active flag changed.
        ListingUpdated { listing_id: ListingId, active: bool },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        /// The listing id was not found.
        ListingNotFound,
        /// The bound agent does not exist.
        AgentNotFound,
        /// Caller fails the agent-identity authorization check.
        NotAuthorized,
        /// The URI exceeds the maximum allowed length.
        UriTooLong,
        /// The declared payment asset has not been created.
        UnknownPaymentAsset,
        /// Unit bounds must satisfy `1 <= min_units <= max_units`.
        InvalidUnitRange,
        /// The seller bond rate exceeds 10000 basis points.
        BondBpsTooHigh,
        /// The challenge window must be non-zero.
        ZeroChallengeWindow,
        /// The delivery window must be non-zero.
        ZeroDeliveryWindow,
        /// Too many listings for this agent.
        TooManyListings,
    }

    // =========================================================
    // Weight trait
    // =========================================================

    pub trait WeightInfo {
        fn create_listing() -> Weight;
        fn update_listing() -> Weight;
    }

    pub struct SubstrateWeight<T>(core::marker::PhantomData<T>);

    impl<T: frame_system::Config> WeightInfo for SubstrateWeight<T> {
        fn create_listing() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn update_listing() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Create a listing bound to `agent_id`.
        ///
        /// The caller must pass the agent-identity authorization check for the
        /// agent. Pricing and policy are immutable once created.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create_listing())]
        pub fn create_listing(
            origin: OriginFor<T>,
            agent_id: AgentId,
            uri: Vec<u8>,
            pricing: Pricing<T::Balance>,
            policy: ListingPolicy,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            ensure!(
                T::AgentIdentity::agent_exists(agent_id),
                Error::<T>::AgentNotFound
            );
            ensure!(
                T::AgentIdentity::is_authorized(agent_id, &who),
                Error::<T>::NotAuthorized
            );

            let uri: BoundedVec<u8, T::MaxUriLength> =
                uri.try_into().map_err(|_| Error::<T>::UriTooLong)?;

            ensure!(
                T::Assets::asset_exists(pricing.payment_token),
                Error::<T>::UnknownPaymentAsset
            );
            ensure!(
                pricing.min_units >= 1 && pricing.min_units <= pricing.max_units,
                Error::<T>::InvalidUnitRange
            );
            ensure!(
                policy.seller_bond_bps <= BPS_DENOMINATOR,
                Error::<T>::BondBpsTooHigh
            );
            ensure!(
                policy.challenge_window_secs > 0,
                Error::<T>::ZeroChallengeWindow
            );
            ensure!(
                policy.delivery_window_secs > 0,
                Error::<T>::ZeroDeliveryWindow
            );

            let listing_id = ListingCount::<T>::get().saturating_add(1);
            let now = <frame_system::Pallet<T>>::block_number();
            let payment_token = pricing.payment_token;

            Listings::<T>::insert(
                listing_id,
                Listing::<T> {
                    agent_id,
                    uri,
                    pricing,
                    policy,
                    active: true,
                    created_at: now,
                },
            );
            ListingCount::<T>::put(listing_id);

            AgentListings::<T>::try_mutate(agent_id, |ids| {
                ids.try_push(listing_id)
                    .map_err(|_| Error::<T>::TooManyListings)
            })?;

            Self::deposit_event(Event::ListingCreated {
                listing_id,
                agent_id,
                payment_token,
            });

            Ok(())
        }

        /// Replace a listing's URI and active flag.
        ///
        /// Authorization is inherited from agent identity at call time, so a
        /// new agent owner controls the listing after a transfer.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::update_listing())]
        pub fn update_listing(
            origin: OriginFor<T>,
            listing_id: ListingId,
            uri: Vec<u8>,
            active: bool,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Listings::<T>::try_mutate(listing_id, |maybe_listing| -> DispatchResult {
                let listing = maybe_listing.as_mut().ok_or(Error::<T>::ListingNotFound)?;
                ensure!(
                    T::AgentIdentity::is_authorized(listing.agent_id, &who),
                    Error::<T>::NotAuthorized
                );

                listing.uri = uri.try_into().map_err(|_| Error::<T>::UriTooLong)?;
                listing.active = active;

                Ok(())
            })?;

            Self::deposit_event(Event::ListingUpdated { listing_id, active });

            Ok(())
        }
    }

    impl<T: Config> ListingRegistryInterface<T::Balance> for Pallet<T> {
        fn listing_terms(listing_id: ListingId) -> Option<ListingTerms<T::Balance>> {
            Listings::<T>::get(listing_id).map(|l| ListingTerms {
                agent_id: l.agent_id,
                pricing: l.pricing,
                policy: l.policy,
                active: l.active,
            })
        }
    }
}
