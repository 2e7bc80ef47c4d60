//! # Payment Assets Pallet
//!
//! A minimal multi-asset fungible ledger backing AgoraChain escrow payments.
//!
//! ## Overview
//!
//! Listings declare the asset they are priced in; the task market pulls escrow
//! and bond deposits from buyers and bond funders via allowances. This pallet
//! provides:
//! - Permissionless asset creation (the creator becomes the issuer)
//! - Issuer-gated minting
//! - Holder transfers and allowance-based `transfer_from` pulls
//!
//! Transfers are exact-amount: the full requested amount is debited from the
//! sender and credited to the recipient, or the call fails. There is no fee,
//! burn, or rebase path.
//!
//! ## Interface
//!
//! ### Dispatchable Functions
//!
//! - `create_asset` - Create a new asset; the caller becomes its issuer
//! - `mint` - Issue new units of an asset (issuer only)
//! - `approve` - Grant a spender an allowance over the caller's balance
//! - `transfer` - Move units to another account
//! - `transfer_from` - Move units out of another account, spending an allowance

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;


use frame_support::pallet_prelude::DispatchResult;

/// Type alias for asset IDs (sequential, non-zero).
pub type AssetId = u32;

/// Interface to the payment ledger for pallets that move escrow funds.
pub trait PaymentAssets<AccountId, Balance> {
    /// Whether the asset id has been created.
    fn asset_exists(asset: AssetId) -> bool;

    /// Balance of `who` in `asset`.
    fn balance_of(asset: AssetId, who: &AccountId) -> Balance;

    /// Move `amount` of `asset` from `from` to `to`.
    fn transfer(
        asset: AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Balance,
    ) -> DispatchResult;

    /// Move `amount` of `asset` out of `owner` to `to`, spending `spender`'s
    /// allowance.
    fn transfer_from(
        asset: AssetId,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Balance,
    ) -> DispatchResult;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::AtLeast32BitUnsigned;

    /// The pallet's configuration trait.
    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching runtime event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;

        /// Unit of account for every asset on the ledger.
        type Balance: Parameter
            + Member
            + AtLeast32BitUnsigned
            + Copy
            + Default
            + MaxEncodedLen;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // ========== Storage ==========

    /// Total number of assets ever created. Asset ids are `1..=AssetCount`.
    #[pallet::storage]
    pub type AssetCount<T: Config> = StorageValue<_, AssetId, ValueQuery>;

    /// Map from asset id to the account allowed to mint it.
    #[pallet::storage]
    pub type AssetIssuer<T: Config> =
        StorageMap<_, Blake2_128Concat, AssetId, T::AccountId, OptionQuery>;

    /// Total minted units per asset.
    #[pallet::storage]
    pub type TotalSupply<T: Config> =
        StorageMap<_, Blake2_128Concat, AssetId, T::Balance, ValueQuery>;

    /// Double map: asset id -> holder -> balance.
    #[pallet::storage]
    pub type Balances<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        AssetId,
        Blake2_128Concat,
        T::AccountId,
        T::Balance,
        ValueQuery,
    >;

    /// Double map: (asset id, owner) -> spender -> remaining allowance.
    #[pallet::storage]
    pub type Allowances<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        (AssetId, T::AccountId),
        Blake2_128Concat,
        T::AccountId,
        T::Balance,
        ValueQuery,
    >;

    // ========== Events ==========

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A new asset was created.
        AssetCreated {
            asset: AssetId,
            issuer: T::AccountId,
        },
        /// New units were minted.
        Minted {
            asset: AssetId,
            to: T::AccountId,
            amount: T::Balance,
        },
        /// An allowance was set.
        ApprovalSet {
            asset: AssetId,
            owner: T::AccountId,
            spender: T::AccountId,
            amount: T::Balance,
        },
        /// Units moved between accounts.
        Transferred {
            asset: AssetId,
            from: T::AccountId,
            to: T::AccountId,
            amount: T::Balance,
        },
    }

    // ========== Errors ==========

    #[pallet::error]
    pub enum Error<T> {
        /// The asset id has not been created.
        UnknownAsset,
        /// Only the asset issuer can mint.
        NotIssuer,
        /// The sender's balance is too low.
        InsufficientBalance,
        /// The spender's allowance is too low.
        InsufficientAllowance,
        /// Arithmetic overflow in balance accounting.
        ArithmeticOverflow,
    }

    // ========== Extrinsics ==========

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Create a new asset. The caller becomes its issuer.
        #[pallet::call_index(0)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(1, 2))]
        pub fn create_asset(origin: OriginFor<T>) -> DispatchResult {
            let issuer = ensure_signed(origin)?;

            let asset = AssetCount::<T>::get().saturating_add(1);
            AssetCount::<T>::put(asset);
            AssetIssuer::<T>::insert(asset, &issuer);

            Self::deposit_event(Event::AssetCreated { asset, issuer });

            Ok(())
        }

        /// Mint `amount` units of `asset` to `to`.
        ///
        /// # Arguments
        /// * `asset` - The asset to mint
        /// * `to` - The recipient account
        /// * `amount` - Units to create
        #[pallet::call_index(1)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(3, 2))]
        pub fn mint(
            origin: OriginFor<T>,
            asset: AssetId,
            to: T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let issuer = AssetIssuer::<T>::get(asset).ok_or(Error::<T>::UnknownAsset)?;
            ensure!(who == issuer, Error::<T>::NotIssuer);

            TotalSupply::<T>::try_mutate(asset, |supply| -> DispatchResult {
                *supply = supply
                    .checked_add(&amount)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;
                Ok(())
            })?;
            Balances::<T>::try_mutate(asset, &to, |balance| -> DispatchResult {
                *balance = balance
                    .checked_add(&amount)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;
                Ok(())
            })?;

            Self::deposit_event(Event::Minted { asset, to, amount });

            Ok(())
        }

        /// Set `spender`'s allowance over the caller's balance to `amount`.
        ///
        /// Overwrites any previous allowance for the same spender.
        #[pallet::call_index(2)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(1, 1))]
        pub fn approve(
            origin: OriginFor<T>,
            asset: AssetId,
            spender: T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            let owner = ensure_signed(origin)?;

            ensure!(
                AssetIssuer::<T>::contains_key(asset),
                Error::<T>::UnknownAsset
            );

            Allowances::<T>::insert((asset, owner.clone()), &spender, amount);

            Self::deposit_event(Event::ApprovalSet {
                asset,
                owner,
                spender,
                amount,
            });

            Ok(())
        }

        /// Transfer `amount` units of `asset` to `to`.
        #[pallet::call_index(3)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(2, 2))]
        pub fn transfer(
            origin: OriginFor<T>,
            asset: AssetId,
            to: T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            let from = ensure_signed(origin)?;

            Self::do_transfer(asset, &from, &to, amount)
        }

        /// Transfer `amount` units of `asset` from `owner` to `to`, spending
        /// the caller's allowance.
        #[pallet::call_index(4)]
        #[pallet::weight(Weight::from_parts(10_000, 0) + T::DbWeight::get().reads_writes(3, 3))]
        pub fn transfer_from(
            origin: OriginFor<T>,
            asset: AssetId,
            owner: T::AccountId,
            to: T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            let spender = ensure_signed(origin)?;

            Self::do_spend_allowance(asset, &spender, &owner, amount)?;
            Self::do_transfer(asset, &owner, &to, amount)
        }
    }

    // ========== Internal helpers ==========

    impl<T: Config> Pallet<T> {
        fn do_transfer(
            asset: AssetId,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            ensure!(
                AssetIssuer::<T>::contains_key(asset),
                Error::<T>::UnknownAsset
            );

            Balances::<T>::try_mutate(asset, from, |balance| -> DispatchResult {
                *balance = balance
                    .checked_sub(&amount)
                    .ok_or(Error::<T>::InsufficientBalance)?;
                Ok(())
            })?;
            Balances::<T>::try_mutate(asset, to, |balance| -> DispatchResult {
                *balance = balance
                    .checked_add(&amount)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;
                Ok(())
            })?;

            Self::deposit_event(Event::Transferred {
                asset,
                from: from.clone(),
                to: to.clone(),
                amount,
            });

            Ok(())
        }

        fn do_spend_allowance(
            asset: AssetId,
            spender: &T::AccountId,
            owner: &T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            Allowances::<T>::try_mutate(
                (asset, owner.clone()),
                spender,
                |allowance| -> DispatchResult {
                    *allowance = allowance
                        .checked_sub(&amount)
                        .ok_or(Error::<T>::InsufficientAllowance)?;
                    Ok(())
                },
            )
        }
    }

    impl<T: Config> PaymentAssets<T::AccountId, T::Balance> for Pallet<T> {
        fn asset_exists(asset: AssetId) -> bool {
            AssetIssuer::<T>::contains_key(asset)
        }

        fn balance_of(asset: AssetId, who: &T::AccountId) -> T::Balance {
            Balances::<T>::get(asset, who)
        }

        fn transfer(
            asset: AssetId,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            Self::do_transfer(asset, from, to, amount)
        }

        fn transfer_from(
            asset: AssetId,
            spender: &T::AccountId,
            owner: &T::AccountId,
            to: &T::AccountId,
            amount: T::Balance,
        ) -> DispatchResult {
            Self::do_spend_allowance(asset, spender, owner, amount)?;
            Self::do_transfer(asset, owner, to, amount)
        }
    }

    // ========== Weight Info Trait ==========

    /// Weight information for the pallet's extrinsics.
    pub trait WeightInfo {
        fn create_asset() -> Weight;
        fn mint() -> Weight;
        fn approve() -> Weight;
        fn transfer() -> Weight;
        fn transfer_from() -> Weight;
    }

    /// Default weights for testing.
    impl WeightInfo for () {
        fn create_asset() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn mint() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn approve() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn transfer() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn transfer_from() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }
}
