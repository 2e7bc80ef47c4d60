//! # Agent Identity Pallet
//!
//! Transferable, non-fungible agent records for the AgoraChain marketplace.
//!
//! ## Overview
//!
//! Every agent is a sequentially numbered record owned by an account. Owners
//! can delegate control two ways:
//! - a single approved delegate per agent, cleared automatically on transfer
//! - blanket operator approval over all agents of an owner
//!
//! Downstream pallets (listing registry, task market) consult the
//! [`AgentIdentityInterface`] to authorize actions against an agent. Agents
//! are never destroyed; ownership moves freely and in-flight tasks keep the
//! seller snapshot they took at activation.
//!
//! ## Interface
//!
//! ### Dispatchable Functions
//!
//! - `register_agent` - Register a new agent; the caller becomes its owner
//! - `set_agent_uri` - Update the metadata URI (owner, delegate, or operator)
//! - `approve` - Set or clear the single approved delegate for an agent
//! - `set_approval_for_all` - Grant or revoke operator rights to another account
//! - `transfer_agent` - Move ownership; clears the single approval

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;


use alloc::vec::Vec;

/// Type alias for agent IDs (sequential, non-zero).
pub type AgentId = u64;

/// Interface to agent identity for pallets that authorize against an agent.
pub trait AgentIdentityInterface<AccountId> {
    /// Whether the agent id has been registered.
    fn agent_exists(agent_id: AgentId) -> bool;

    /// Current owner of an agent.
    fn owner_of(agent_id: AgentId) -> Option<AccountId>;

    /// The single approved delegate for an agent, if any.
    fn get_approved(agent_id: AgentId) -> Option<AccountId>;

    /// Whether `operator` holds blanket approval over all of `owner`'s agents.
    fn is_approved_for_all(owner: &AccountId, operator: &AccountId) -> bool;

    /// Whether `who` is the owner, the approved delegate, or an operator for
    /// the agent's owner.
    fn is_authorized(agent_id: AgentId, who: &AccountId) -> bool;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;

    /// Core agent information stored on-chain.
    #[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct AgentRecord<T: Config> {
        /// The account that owns this agent.
        pub owner: T::AccountId,
        /// Opaque metadata URI.
        pub uri: BoundedVec<u8, T::MaxUriLength>,
        /// Block number when the agent was registered.
        pub registered_at: BlockNumberFor<T>,
    }

    impl<T: Config> codec::DecodeWithMemTracking for AgentRecord<T> {}

    /// The pallet's configuration trait.
    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching runtime event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;

        /// Maximum byte length of an agent metadata URI.
        #[pallet::constant]
        type MaxUriLength: Get<u32>;

        /// Maximum number of agents a single account can own.
        #[pallet::constant]
        type MaxAgentsPerOwner: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // ========== Storage ==========

    /// Map from AgentId to AgentRecord.
    #[pallet::storage]
    pub type Agents<T: Config> =
        StorageMap<_, Blake2_128Concat, AgentId, AgentRecord<T>, OptionQuery>;

    /// Total number of registered agents. Agent ids are `1..=AgentCount`.
    #[pallet::storage]
    pub type AgentCount<T: Config> = StorageValue<_, u64, ValueQuery>;

    /// Map from AgentId to its single approved delegate.
    #[pallet::storage]
    pub type ApprovedDelegate<T: Config> =
        StorageMap<_, Blake2_128Concat, AgentId, T::AccountId, OptionQuery>;

    /// Double map: owner -> operator -> blanket approval flag.
    #[pallet::storage]
    pub type OperatorApprovals<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        Blake2_128Concat,
        T::AccountId,
        bool,
        ValueQuery,
    >;

    /// Map from owner AccountId to their list of agent IDs.
    #[pallet::storage]
    pub type OwnerAgents<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        BoundedVec<AgentId, T::MaxAgentsPerOwner>,
        ValueQuery,
    >;

    // ========== Events ==========

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A new agent was registered.
        AgentRegistered {
            agent_id: AgentId,
            owner: T::AccountId,
            uri: Vec<u8>,
        },
        /// An agent's metadata URI was updated.
        AgentUriUpdated { agent_id: AgentId, uri: Vec<u8> },
        /// The single approved delegate for an agent changed.
        AgentApproval {
            agent_id: AgentId,
            delegate: Option<T::AccountId>,
        },
        /// Operator approval was granted or revoked.
        OperatorApprovalSet {
            owner: T::AccountId,
            operator: T::AccountId,
            approved: bool,
        },
        /// An agent changed owner.
        AgentTransferred {
            agent_id: AgentId,
            from: T::AccountId,
            to: T::AccountId,
        },
    }

    // ========== Errors ==========

    #[pallet::error]
    pub enum Error<T> {
        /// The agent ID was not found in the registry.
        AgentNotFound,
        /// Caller is not the owner, approved delegate, or operator.
        NotAuthorized,
        /// The URI exceeds the maximum allowed length.
        UriTooLong,
        /// The account has reached the maximum number of agents.
        TooManyAgents,
        /// An account cannot grant operator approval to itself.
        SelfApproval,
    }

    // ========== Extrinsics ==========

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Register a new agent on-chain.
        ///
        /// The caller becomes the owner of the agent.
        ///
        /// # Arguments
        /// * `uri` - Opaque metadata URI for the agent
        #[pallet::call_index(0)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(2, 3))]
        pub fn register_agent(origin: OriginFor<T>, uri: Vec<u8>) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let bounded_uri: BoundedVec<u8, T::MaxUriLength> =
                uri.clone().try_into().map_err(|_| Error::<T>::UriTooLong)?;

            let agent_id = AgentCount::<T>::get().saturating_add(1);
            let current_block = <frame_system::Pallet<T>>::block_number();

            Agents::<T>::insert(
                agent_id,
                AgentRecord::<T> {
                    owner: who.clone(),
                    uri: bounded_uri,
                    registered_at: current_block,
                },
            );
            AgentCount::<T>::put(agent_id);

            OwnerAgents::<T>::try_mutate(&who, |agents| {
                agents
                    .try_push(agent_id)
                    .map_err(|_| Error::<T>::TooManyAgents)
            })?;

            Self::deposit_event(Event::AgentRegistered {
                agent_id,
                owner: who,
                uri,
            });

            Ok(())
        }

        /// Update an agent's metadata URI.
        ///
        /// The caller must be the owner, the approved delegate for this agent,
        /// or an operator for the owner.
        #[pallet::call_index(1)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(3, 1))]
        pub fn set_agent_uri(
            origin: OriginFor<T>,
            agent_id: AgentId,
            uri: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Agents::<T>::try_mutate(agent_id, |maybe_agent| -> DispatchResult {
                let agent = maybe_agent.as_mut().ok_or(Error::<T>::AgentNotFound)?;
                ensure!(
                    Self::check_authorized(agent_id, &agent.owner, &who),
                    Error::<T>::NotAuthorized
                );

                agent.uri = uri
                    .clone()
                    .try_into()
                    .map_err(|_| Error::<T>::UriTooLong)?;

                Ok(())
            })?;

            Self::deposit_event(Event::AgentUriUpdated { agent_id, uri });

            Ok(())
        }

        /// Set or clear the single approved delegate for an agent.
        ///
        /// The caller must be the owner or an operator for the owner. The
        /// delegate may act on the agent until ownership transfers.
        #[pallet::call_index(2)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(2, 1))]
        pub fn approve(
            origin: OriginFor<T>,
            agent_id: AgentId,
            delegate: Option<T::AccountId>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let agent = Agents::<T>::get(agent_id).ok_or(Error::<T>::AgentNotFound)?;
            ensure!(
                agent.owner == who || OperatorApprovals::<T>::get(&agent.owner, &who),
                Error::<T>::NotAuthorized
            );

            match &delegate {
                Some(d) => ApprovedDelegate::<T>::insert(agent_id, d),
                None => ApprovedDelegate::<T>::remove(agent_id),
            }

            Self::deposit_event(Event::AgentApproval { agent_id, delegate });

            Ok(())
        }

        /// Grant or revoke blanket operator rights over all of the caller's
        /// agents.
        #[pallet::call_index(3)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(0, 1))]
        pub fn set_approval_for_all(
            origin: OriginFor<T>,
            operator: T::AccountId,
            approved: bool,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(who != operator, Error::<T>::SelfApproval);

            if approved {
                OperatorApprovals::<T>::insert(&who, &operator, true);
            } else {
                OperatorApprovals::<T>::remove(&who, &operator);
            }

            Self::deposit_event(Event::OperatorApprovalSet {
                owner: who,
                operator,
                approved,
            });

            Ok(())
        }

        /// Transfer an agent to a new owner.
        ///
        /// The caller must be the owner, the approved delegate, or an
        /// operator. The single approval is cleared on transfer.
        #[pallet::call_index(4)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(4, 4))]
        pub fn transfer_agent(
            origin: OriginFor<T>,
            agent_id: AgentId,
            to: T::AccountId,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let from = Agents::<T>::try_mutate(agent_id, |maybe_agent| {
                let agent = maybe_agent.as_mut().ok_or(Error::<T>::AgentNotFound)?;
                ensure!(
                    Self::check_authorized(agent_id, &agent.owner, &who),
                    Error::<T>::NotAuthorized
                );

                let from = agent.owner.clone();
                agent.owner = to.clone();
                Ok::<T::AccountId, DispatchError>(from)
            })?;

            ApprovedDelegate::<T>::remove(agent_id);

            OwnerAgents::<T>::mutate(&from, |agents| {
                agents.retain(|&id| id != agent_id);
            });
            OwnerAgents::<T>::try_mutate(&to, |agents| {
                agents
                    .try_push(agent_id)
                    .map_err(|_| Error::<T>::TooManyAgents)
            })?;

            Self::deposit_event(Event::AgentTransferred { agent_id, from, to });

            Ok(())
        }
    }

    // ========== Internal helpers ==========

    impl<T: Config> Pallet<T> {
        fn check_authorized(agent_id: AgentId, owner: &T::AccountId, who: &T::AccountId) -> bool {
            owner == who
                || ApprovedDelegate::<T>::get(agent_id).as_ref() == Some(who)
                || OperatorApprovals::<T>::get(owner, who)
        }
    }

    impl<T: Config> AgentIdentityInterface<T::AccountId> for Pallet<T> {
        fn agent_exists(agent_id: AgentId) -> bool {
            Agents::<T>::contains_key(agent_id)
        }

        fn owner_of(agent_id: AgentId) -> Option<T::AccountId> {
            Agents::<T>::get(agent_id).map(|a| a.owner)
        }

        fn get_approved(agent_id: AgentId) -> Option<T::AccountId> {
            ApprovedDelegate::<T>::get(agent_id)
        }

        fn is_approved_for_all(owner: &T::AccountId, operator: &T::AccountId) -> bool {
            OperatorApprovals::<T>::get(owner, operator)
        }

        fn is_authorized(agent_id: AgentId, who: &T::AccountId) -> bool {
            match Agents::<T>::get(agent_id) {
                Some(agent) => Self::check_authorized(agent_id, &agent.owner, who),
                None => false,
            }
        }
    }

    // ========== Weight Info Trait ==========

    /// Weight information for the pallet's extrinsics.
    pub trait WeightInfo {
        fn register_agent() -> Weight;
        fn set_agent_uri() -> Weight;
        fn approve() -> Weight;
        fn set_approval_for_all() -> Weight;
        fn transfer_agent() -> Weight;
    }

    /// Default weights for testing.
    impl WeightInfo for () {
        fn register_agent() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn set_agent_uri() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn approve() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn set_approval_for_all() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn transfer_agent() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }
}
