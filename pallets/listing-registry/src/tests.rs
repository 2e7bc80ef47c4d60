//! Unit tests for the Listing Registry pallet.

use crate::{self as pallet_listing_registry, pallet::*, *};
use frame_support::{assert_noop, assert_ok, parameter_types};
use sp_core::H256;
use sp_runtime::{
    traits::{BlakeTwo256, IdentityLookup},
    BuildStorage,
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
    pub enum Test
    {
        System: frame_system,
        PaymentAssets: pallet_payment_assets,
        AgentIdentity: pallet_agent_identity,
        ListingRegistry: pallet_listing_registry,
    }
);

impl frame_system::Config for Test {
    type BaseCallFilter = frame_support::traits::Everything;
    type BlockWeights = ();
    type BlockLength = ();
    type RuntimeOrigin = RuntimeOrigin;
    type RuntimeCall = RuntimeCall;
    type Nonce = u64;
    type Hash = H256;
    type Hashing = BlakeTwo256;
    type AccountId = u64;
    type Lookup = IdentityLookup<Self::AccountId>;
    type Block = Block;
    type RuntimeEvent = RuntimeEvent;
    type BlockHashCount = frame_support::traits::ConstU64<250>;
    type DbWeight = ();
    type Version = ();
    type PalletInfo = PalletInfo;
    type AccountData = ();
    type OnNewAccount = ();
    type OnKilledAccount = ();
    type SystemWeightInfo = ();
    type SS58Prefix = ();
    type OnSetCode = ();
    type MaxConsumers = frame_support::traits::ConstU32<16>;
    type SingleBlockMigrations = ();
    type MultiBlockMigrator = ();
    type PreInherents = ();
    type PostInherents = ();
    type PostTransactions = ();
    type RuntimeTask = ();
    type ExtensionsWeightInfo = ();
}

impl pallet_payment_assets::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type Balance = u128;
}

parameter_types! {
    pub const MaxUriLength: u32 = 2048;
    pub const MaxAgentsPerOwner: u32 = 50;
    pub const MaxListingsPerAgent: u32 = 50;
}

impl pallet_agent_identity::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type MaxUriLength = MaxUriLength;
    type MaxAgentsPerOwner = MaxAgentsPerOwner;
}

impl pallet_listing_registry::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = SubstrateWeight<Test>;
    type Balance = u128;
    type Assets = PaymentAssets;
    type AgentIdentity = AgentIdentity;
    type MaxUriLength = MaxUriLength;
    type MaxListingsPerAgent = MaxListingsPerAgent;
}

const ALICE: u64 = 1;
const BOB: u64 = 2;
const CHARLIE: u64 = 3;

fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .unwrap();

    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}

// Helper: register an agent for `owner` and create the payment asset.
fn setup_agent_and_asset(owner: u64) -> (u64, u32) {
    assert_ok!(AgentIdentity::register_agent(
        RuntimeOrigin::signed(owner),
        b"ipfs://agent".to_vec()
    ));
    assert_ok!(PaymentAssets::create_asset(RuntimeOrigin::signed(owner)));
    (
        pallet_agent_identity::AgentCount::<Test>::get(),
        pallet_payment_assets::AssetCount::<Test>::get(),
    )
}

fn default_pricing(asset: u32) -> Pricing<u128> {
    Pricing {
        payment_token: asset,
        base_price: 100,
        unit_type: [0u8; 32],
        unit_price: 10,
        min_units: 1,
        max_units: 10,
        quote_required: true,
    }
}

fn default_policy() -> ListingPolicy {
    ListingPolicy {
        challenge_window_secs: 3_600,
        post_dispute_window_secs: 0,
        delivery_window_secs: 7_200,
        seller_bond_bps: 0,
    }
}

// ========== Creation ==========

#[test]
fn create_listing_works() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);

        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            b"ipfs://listing".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        let listing_id = ListingCount::<Test>::get();
        assert_eq!(listing_id, 1);

        let listing = Listings::<Test>::get(listing_id).unwrap();
        assert_eq!(listing.agent_id, agent_id);
        assert_eq!(listing.pricing.base_price, 100);
        assert!(listing.active);
        assert_eq!(
            AgentListings::<Test>::get(agent_id).to_vec(),
            vec![listing_id]
        );

        System::assert_has_event(
            Event::<Test>::ListingCreated {
                listing_id,
                agent_id,
                payment_token: asset,
            }
            .into(),
        );
    });
}

#[test]
fn create_listing_works_for_delegate_and_operator() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);

        assert_ok!(AgentIdentity::approve(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            Some(BOB)
        ));
        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(BOB),
            agent_id,
            b"by-delegate".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        assert_ok!(AgentIdentity::set_approval_for_all(
            RuntimeOrigin::signed(ALICE),
            CHARLIE,
            true
        ));
        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(CHARLIE),
            agent_id,
            b"by-operator".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        assert_eq!(ListingCount::<Test>::get(), 2);
    });
}

#[test]
fn create_listing_fails_for_stranger() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(BOB),
                agent_id,
                b"x".to_vec(),
                default_pricing(asset),
                default_policy(),
            ),
            Error::<Test>::NotAuthorized
        );
    });
}

#[test]
fn create_listing_fails_for_unknown_agent() {
    new_test_ext().execute_with(|| {
        let (_, asset) = setup_agent_and_asset(ALICE);
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                42,
                b"x".to_vec(),
                default_pricing(asset),
                default_policy(),
            ),
            Error::<Test>::AgentNotFound
        );
    });
}

#[test]
fn create_listing_validates_pricing_and_policy() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);

        let mut pricing = default_pricing(asset);
        pricing.payment_token = 9;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                pricing,
                default_policy(),
            ),
            Error::<Test>::UnknownPaymentAsset
        );

        let mut pricing = default_pricing(asset);
        pricing.min_units = 0;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                pricing,
                default_policy(),
            ),
            Error::<Test>::InvalidUnitRange
        );

        let mut pricing = default_pricing(asset);
        pricing.min_units = 5;
        pricing.max_units = 4;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                pricing,
                default_policy(),
            ),
            Error::<Test>::InvalidUnitRange
        );

        let mut policy = default_policy();
        policy.seller_bond_bps = 10_001;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                default_pricing(asset),
                policy,
            ),
            Error::<Test>::BondBpsTooHigh
        );

        let mut policy = default_policy();
        policy.challenge_window_secs = 0;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                default_pricing(asset),
                policy,
            ),
            Error::<Test>::ZeroChallengeWindow
        );

        let mut policy = default_policy();
        policy.delivery_window_secs = 0;
        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                b"x".to_vec(),
                default_pricing(asset),
                policy,
            ),
            Error::<Test>::ZeroDeliveryWindow
        );

        assert_noop!(
            ListingRegistry::create_listing(
                RuntimeOrigin::signed(ALICE),
                agent_id,
                vec![0u8; 2049],
                default_pricing(asset),
                default_policy(),
            ),
            Error::<Test>::UriTooLong
        );
    });
}

// ========== Updates ==========

#[test]
fn update_listing_replaces_uri_and_active() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);
        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            b"v1".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        assert_ok!(ListingRegistry::update_listing(
            RuntimeOrigin::signed(ALICE),
            1,
            b"v2".to_vec(),
            false
        ));

        let listing = Listings::<Test>::get(1).unwrap();
        assert_eq!(listing.uri.to_vec(), b"v2".to_vec());
        assert!(!listing.active);
        // Pricing survives untouched.
        assert_eq!(listing.pricing, default_pricing(asset));

        System::assert_has_event(
            Event::<Test>::ListingUpdated {
                listing_id: 1,
                active: false,
            }
            .into(),
        );
    });
}

#[test]
fn update_listing_fails_for_unknown_id() {
    new_test_ext().execute_with(|| {
        assert_noop!(
            ListingRegistry::update_listing(RuntimeOrigin::signed(ALICE), 1, b"x".to_vec(), true),
            Error::<Test>::ListingNotFound
        );
    });
}

#[test]
fn listing_control_follows_agent_transfer() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);
        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            b"v1".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        assert_ok!(AgentIdentity::transfer_agent(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            BOB
        ));

        assert_noop!(
            ListingRegistry::update_listing(RuntimeOrigin::signed(ALICE), 1, b"x".to_vec(), false),
            Error::<Test>::NotAuthorized
        );
        assert_ok!(ListingRegistry::update_listing(
            RuntimeOrigin::signed(BOB),
            1,
            b"new-owner".to_vec(),
            false
        ));
    });
}

// ========== Read interface ==========

#[test]
fn listing_terms_exposes_pricing_and_policy() {
    new_test_ext().execute_with(|| {
        let (agent_id, asset) = setup_agent_and_asset(ALICE);
        assert_ok!(ListingRegistry::create_listing(
            RuntimeOrigin::signed(ALICE),
            agent_id,
            b"v1".to_vec(),
            default_pricing(asset),
            default_policy(),
        ));

        let terms =
            <ListingRegistry as ListingRegistryInterface<u128>>::listing_terms(1).unwrap();
        assert_eq!(terms.agent_id, agent_id);
        assert_eq!(terms.pricing.unit_price, 10);
        assert_eq!(terms.policy.delivery_window_secs, 7_200);
        assert!(terms.active);

        assert!(<ListingRegistry as ListingRegistryInterface<u128>>::listing_terms(2).is_none());
    });
}
