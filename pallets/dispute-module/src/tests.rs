//! Unit and integration tests for the Dispute Module pallet.
//!
//! The mock runtime wires all five pallets together the way a real runtime
//! does (market -> dispute module routing and back), so this suite doubles as
//! the end-to-end suite for the whole marketplace.

use crate::{self as pallet_dispute_module, pallet::*};
use frame_support::{assert_noop, assert_ok, parameter_types, PalletId};
use pallet_listing_registry::{ListingPolicy, Pricing};
use pallet_task_market::{DisputeOutcome, TaskStatus};
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
        Timestamp: pallet_timestamp,
        PaymentAssets: pallet_payment_assets,
        AgentIdentity: pallet_agent_identity,
        ListingRegistry: pallet_listing_registry,
        TaskMarket: pallet_task_market,
        DisputeModule: pallet_dispute_module,
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

impl pallet_timestamp::Config for Test {
    type Moment = u64;
    type OnTimestampSet = ();
    type MinimumPeriod = frame_support::traits::ConstU64<1>;
    type WeightInfo = ();
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
    type WeightInfo = pallet_listing_registry::SubstrateWeight<Test>;
    type Balance = u128;
    type Assets = PaymentAssets;
    type AgentIdentity = AgentIdentity;
    type MaxUriLength = MaxUriLength;
    type MaxListingsPerAgent = MaxListingsPerAgent;
}

parameter_types! {
    pub const TaskMarketPalletId: PalletId = PalletId(*b"agoramkt");
    pub const DisputeModulePalletId: PalletId = PalletId(*b"agoradsp");
    pub const DisputeModuleUpdateDelay: u64 = 86_400;
}

impl pallet_task_market::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = pallet_task_market::SubstrateWeight<Test>;
    type Balance = u128;
    type Assets = PaymentAssets;
    type AgentIdentity = AgentIdentity;
    type Listings = ListingRegistry;
    type DisputeRouter = DisputeModule;
    type TimeProvider = Timestamp;
    type PalletId = TaskMarketPalletId;
    type MaxUriLength = MaxUriLength;
    type DisputeModuleUpdateDelay = DisputeModuleUpdateDelay;
}

impl pallet_dispute_module::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = SubstrateWeight<Test>;
    type Market = TaskMarket;
    type TimeProvider = Timestamp;
    type PalletId = DisputeModulePalletId;
    type MaxUriLength = MaxUriLength;
}

// =========================================================
// Test helpers
// =========================================================

const ALICE: u64 = 1; // agent owner / seller
const BOB: u64 = 2; // buyer
const CHARLIE: u64 = 3; // third party
const DAVE: u64 = 4; // later agent owner
const ADMIN: u64 = 100;
const OWNER: u64 = 200;
const RESOLVER: u64 = 201;

const START: u64 = 1_000;

fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .unwrap();

    pallet_task_market::GenesisConfig::<Test> {
        admin: Some(ADMIN),
    }
    .assimilate_storage(&mut t)
    .unwrap();

    pallet_dispute_module::GenesisConfig::<Test> {
        owner: Some(OWNER),
        resolvers: vec![RESOLVER],
    }
    .assimilate_storage(&mut t)
    .unwrap();

    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| {
        System::set_block_number(1);
        set_now(START);
        assert_ok!(TaskMarket::set_dispute_module(
            RuntimeOrigin::signed(ADMIN),
            module()
        ));
    });
    ext
}

fn set_now(secs: u64) {
    pallet_timestamp::Pallet::<Test>::set_timestamp(secs * 1_000);
}

fn module() -> u64 {
    DisputeModule::account_id()
}

fn market() -> u64 {
    TaskMarket::custody_account()
}

fn balance(asset: u32, who: u64) -> u128 {
    pallet_payment_assets::Balances::<Test>::get(asset, who)
}

/// Register ALICE's agent (id 1), create asset 1, mint buyer and seller-side
/// balances, and create a listing with the given knobs (base 100, unit 10,
/// challenge 3600s, delivery 7200s).
fn bootstrap(
    bond_bps: u32,
    quote_required: bool,
    post_dispute_window: u64,
    max_units: u32,
) -> u32 {
    assert_ok!(AgentIdentity::register_agent(
        RuntimeOrigin::signed(ALICE),
        b"ipfs://agent".to_vec()
    ));
    assert_ok!(PaymentAssets::create_asset(RuntimeOrigin::signed(ALICE)));
    let asset = pallet_payment_assets::AssetCount::<Test>::get();
    assert_ok!(PaymentAssets::mint(
        RuntimeOrigin::signed(ALICE),
        asset,
        BOB,
        10_000
    ));
    assert_ok!(PaymentAssets::mint(
        RuntimeOrigin::signed(ALICE),
        asset,
        ALICE,
        1_000
    ));

    assert_ok!(ListingRegistry::create_listing(
        RuntimeOrigin::signed(ALICE),
        1,
        b"ipfs://listing".to_vec(),
        Pricing {
            payment_token: asset,
            base_price: 100,
            unit_type: *b"document-pages__________________",
            unit_price: 10,
            min_units: 1,
            max_units,
            quote_required,
        },
        ListingPolicy {
            challenge_window_secs: 3_600,
            post_dispute_window_secs: post_dispute_window,
            delivery_window_secs: 7_200,
            seller_bond_bps: bond_bps,
        },
    ));
    asset
}

fn post_and_quote(units: u32, total: u128) -> u64 {
    assert_ok!(TaskMarket::post_task(
        RuntimeOrigin::signed(BOB),
        1,
        b"ipfs://task".to_vec(),
        units
    ));
    let task_id = pallet_task_market::TaskCount::<Test>::get();
    assert_ok!(TaskMarket::propose_quote(
        RuntimeOrigin::signed(ALICE),
        task_id,
        units,
        total,
        START + 3_600
    ));
    task_id
}

fn fund_own_bond(asset: u32, task_id: u64, amount: u128) {
    assert_ok!(PaymentAssets::approve(
        RuntimeOrigin::signed(ALICE),
        asset,
        market(),
        amount
    ));
    assert_ok!(TaskMarket::fund_seller_bond(
        RuntimeOrigin::signed(ALICE),
        task_id,
        amount
    ));
}

fn fund_and_activate(asset: u32, task_id: u64, total: u128) {
    assert_ok!(PaymentAssets::approve(
        RuntimeOrigin::signed(BOB),
        asset,
        market(),
        total
    ));
    assert_ok!(TaskMarket::fund_task(
        RuntimeOrigin::signed(BOB),
        task_id,
        total
    ));
    assert_ok!(TaskMarket::accept_quote(RuntimeOrigin::signed(BOB), task_id));
}

fn submit(task_id: u64) {
    assert_ok!(TaskMarket::submit_deliverable(
        RuntimeOrigin::signed(ALICE),
        task_id,
        b"ipfs://artifact".to_vec(),
        H256::repeat_byte(7)
    ));
}

/// Submitted bond-free task worth 140 (4 units).
fn setup_submitted_task() -> (u64, u32) {
    let asset = bootstrap(0, true, 0, 10);
    let task_id = post_and_quote(4, 140);
    fund_and_activate(asset, task_id, 140);
    submit(task_id);
    (task_id, asset)
}

fn open_default_dispute(task_id: u64) {
    assert_ok!(DisputeModule::open_dispute(
        RuntimeOrigin::signed(BOB),
        task_id,
        b"ipfs://complaint".to_vec()
    ));
}

// ========== Opening ==========

#[test]
fn open_dispute_records_and_marks_market() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        set_now(START + 100);
        open_default_dispute(task_id);

        let record = Disputes::<Test>::get(task_id).unwrap();
        assert!(record.opened);
        assert!(!record.resolved);
        assert_eq!(record.buyer, BOB);
        assert_eq!(record.dispute_uri.to_vec(), b"ipfs://complaint".to_vec());
        assert_eq!(record.outcome, DisputeOutcome::SellerWins);
        assert_eq!(record.opened_at, START + 100);

        let task = pallet_task_market::Tasks::<Test>::get(task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Disputed);
        assert_eq!(task.disputed_at, START + 100);

        System::assert_has_event(
            Event::<Test>::DisputeOpened {
                task_id,
                buyer: BOB,
                dispute_uri: b"ipfs://complaint".to_vec(),
            }
            .into(),
        );
        System::assert_has_event(
            pallet_task_market::Event::<Test>::SubmissionDisputed {
                task_id,
                dispute_uri: b"ipfs://complaint".to_vec(),
            }
            .into(),
        );
    });
}

#[test]
fn open_dispute_fails_for_non_buyer() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(CHARLIE), task_id, b"x".to_vec()),
            Error::<Test>::NotTaskBuyer
        );
    });
}

#[test]
fn open_dispute_fails_exactly_at_deadline() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        set_now(START + 3_600);
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(BOB), task_id, b"x".to_vec()),
            Error::<Test>::ChallengeWindowClosed
        );
    });
}

#[test]
fn open_dispute_fails_when_task_not_submitted() {
    new_test_ext().execute_with(|| {
        bootstrap(0, true, 0, 10);
        let task_id = post_and_quote(4, 140);
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(BOB), task_id, b"x".to_vec()),
            Error::<Test>::TaskNotSubmitted
        );
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(BOB), 42, b"x".to_vec()),
            Error::<Test>::UnknownTask
        );
    });
}

#[test]
fn open_dispute_fails_when_already_opened() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        open_default_dispute(task_id);
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(BOB), task_id, b"x".to_vec()),
            Error::<Test>::DisputeAlreadyOpened
        );
    });
}

#[test]
fn open_dispute_fails_for_long_uri() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        assert_noop!(
            DisputeModule::open_dispute(RuntimeOrigin::signed(BOB), task_id, vec![0u8; 2049]),
            Error::<Test>::UriTooLong
        );
    });
}

#[test]
fn market_delegation_converges_on_same_record() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();

        assert_ok!(TaskMarket::dispute_submission(
            RuntimeOrigin::signed(BOB),
            task_id,
            b"ipfs://via-market".to_vec()
        ));

        let record = Disputes::<Test>::get(task_id).unwrap();
        assert_eq!(record.buyer, BOB);
        assert_eq!(record.dispute_uri.to_vec(), b"ipfs://via-market".to_vec());
        assert_eq!(
            pallet_task_market::Tasks::<Test>::get(task_id).unwrap().status,
            TaskStatus::Disputed
        );
    });
}

// ========== Resolution ==========

#[test]
fn resolve_dispute_persists_outcome_and_settles() {
    new_test_ext().execute_with(|| {
        let (task_id, asset) = setup_submitted_task();
        open_default_dispute(task_id);

        assert_ok!(DisputeModule::resolve_dispute(
            RuntimeOrigin::signed(RESOLVER),
            task_id,
            DisputeOutcome::BuyerWins,
            b"ipfs://verdict".to_vec()
        ));

        let record = Disputes::<Test>::get(task_id).unwrap();
        assert!(record.resolved);
        assert_eq!(record.outcome, DisputeOutcome::BuyerWins);
        assert_eq!(record.resolution_uri.to_vec(), b"ipfs://verdict".to_vec());

        let task = pallet_task_market::Tasks::<Test>::get(task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Settled);
        assert!(task.settled);
        assert_eq!(balance(asset, BOB), 10_000);
        assert_eq!(balance(asset, market()), 0);

        System::assert_has_event(
            Event::<Test>::DisputeResolved {
                task_id,
                resolver: RESOLVER,
                outcome: DisputeOutcome::BuyerWins,
                resolution_uri: b"ipfs://verdict".to_vec(),
            }
            .into(),
        );
    });
}

#[test]
fn resolve_dispute_fails_for_non_resolver() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        open_default_dispute(task_id);
        assert_noop!(
            DisputeModule::resolve_dispute(
                RuntimeOrigin::signed(CHARLIE),
                task_id,
                DisputeOutcome::SellerWins,
                b"x".to_vec()
            ),
            Error::<Test>::NotResolver
        );
    });
}

#[test]
fn resolve_dispute_fails_when_already_resolved() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        open_default_dispute(task_id);
        assert_ok!(DisputeModule::resolve_dispute(
            RuntimeOrigin::signed(RESOLVER),
            task_id,
            DisputeOutcome::SellerWins,
            b"x".to_vec()
        ));
        assert_noop!(
            DisputeModule::resolve_dispute(
                RuntimeOrigin::signed(RESOLVER),
                task_id,
                DisputeOutcome::BuyerWins,
                b"x".to_vec()
            ),
            Error::<Test>::DisputeAlreadyResolved
        );
    });
}

#[test]
fn resolve_reconstructs_record_for_dispute_opened_under_old_module() {
    new_test_ext().execute_with(|| {
        let (task_id, asset) = setup_submitted_task();

        // The dispute was marked on the market by a previous module: drive the
        // callback directly from the module account, leaving no record here.
        assert_ok!(TaskMarket::mark_disputed(
            RuntimeOrigin::signed(module()),
            task_id,
            b"ipfs://old-module".to_vec()
        ));
        assert!(Disputes::<Test>::get(task_id).is_none());

        assert_ok!(DisputeModule::resolve_dispute(
            RuntimeOrigin::signed(RESOLVER),
            task_id,
            DisputeOutcome::Cancel,
            b"ipfs://verdict".to_vec()
        ));

        let record = Disputes::<Test>::get(task_id).unwrap();
        assert!(record.opened);
        assert!(record.resolved);
        assert_eq!(record.buyer, BOB);
        assert_eq!(record.outcome, DisputeOutcome::Cancel);
        assert_eq!(record.opened_at, 0);

        assert_eq!(balance(asset, BOB), 10_000);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn resolve_fails_when_task_never_disputed() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        assert_noop!(
            DisputeModule::resolve_dispute(
                RuntimeOrigin::signed(RESOLVER),
                task_id,
                DisputeOutcome::SellerWins,
                b"x".to_vec()
            ),
            Error::<Test>::TaskNotDisputed
        );
    });
}

// ========== Resolver set and ownership ==========

#[test]
fn owner_curates_resolver_set() {
    new_test_ext().execute_with(|| {
        assert_ok!(DisputeModule::add_resolver(
            RuntimeOrigin::signed(OWNER),
            CHARLIE
        ));
        assert!(Resolvers::<Test>::get(CHARLIE));

        assert_ok!(DisputeModule::remove_resolver(
            RuntimeOrigin::signed(OWNER),
            CHARLIE
        ));
        assert!(!Resolvers::<Test>::get(CHARLIE));

        assert_noop!(
            DisputeModule::add_resolver(RuntimeOrigin::signed(CHARLIE), CHARLIE),
            Error::<Test>::NotOwner
        );
    });
}

#[test]
fn removed_resolver_loses_resolution_rights() {
    new_test_ext().execute_with(|| {
        let (task_id, _) = setup_submitted_task();
        open_default_dispute(task_id);

        assert_ok!(DisputeModule::remove_resolver(
            RuntimeOrigin::signed(OWNER),
            RESOLVER
        ));
        assert_noop!(
            DisputeModule::resolve_dispute(
                RuntimeOrigin::signed(RESOLVER),
                task_id,
                DisputeOutcome::SellerWins,
                b"x".to_vec()
            ),
            Error::<Test>::NotResolver
        );
    });
}

#[test]
fn ownership_transfer_is_two_step() {
    new_test_ext().execute_with(|| {
        assert_ok!(DisputeModule::transfer_ownership(
            RuntimeOrigin::signed(OWNER),
            DAVE
        ));
        assert_eq!(Owner::<Test>::get(), Some(OWNER));

        assert_noop!(
            DisputeModule::accept_ownership(RuntimeOrigin::signed(CHARLIE)),
            Error::<Test>::NotPendingOwner
        );

        assert_ok!(DisputeModule::accept_ownership(RuntimeOrigin::signed(DAVE)));
        assert_eq!(Owner::<Test>::get(), Some(DAVE));

        assert_noop!(
            DisputeModule::add_resolver(RuntimeOrigin::signed(OWNER), CHARLIE),
            Error::<Test>::NotOwner
        );
        assert_ok!(DisputeModule::add_resolver(
            RuntimeOrigin::signed(DAVE),
            CHARLIE
        ));

        System::assert_has_event(
            Event::<Test>::OwnershipTransferred {
                previous: OWNER,
                new: DAVE,
            }
            .into(),
        );
    });
}

// ========== End-to-end scenarios ==========

#[test]
fn e2e_happy_path_with_quote() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(0, true, 0, 10);

        assert_ok!(TaskMarket::post_task(
            RuntimeOrigin::signed(BOB),
            1,
            b"ipfs://task".to_vec(),
            4
        ));
        assert_ok!(TaskMarket::propose_quote(
            RuntimeOrigin::signed(ALICE),
            1,
            4,
            140,
            START + 3_600
        ));
        fund_and_activate(asset, 1, 140);
        submit(1);
        assert_ok!(TaskMarket::accept_submission(RuntimeOrigin::signed(BOB), 1));

        assert_eq!(balance(asset, BOB), 9_860);
        assert_eq!(balance(asset, ALICE), 1_000 + 140);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn e2e_silent_timeout_settles_for_seller() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(0, false, 0, 10);

        assert_ok!(TaskMarket::post_task(
            RuntimeOrigin::signed(BOB),
            1,
            b"ipfs://task".to_vec(),
            1
        ));
        assert_ok!(TaskMarket::accept_task(RuntimeOrigin::signed(ALICE), 1));
        assert_eq!(
            pallet_task_market::Tasks::<Test>::get(1)
                .unwrap()
                .quoted_total_price,
            110
        );
        fund_and_activate(asset, 1, 110);
        submit(1);

        let submitted_at = pallet_task_market::Tasks::<Test>::get(1).unwrap().submitted_at;
        set_now(submitted_at + 3_601);
        assert_ok!(TaskMarket::settle_after_timeout(
            RuntimeOrigin::signed(CHARLIE),
            1
        ));

        assert_eq!(balance(asset, ALICE), 1_000 + 110);
        assert_eq!(balance(asset, BOB), 9_890);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn e2e_dispute_split_halves_escrow() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(0, true, 0, 20);

        // 14 units @ 10 + base 100 = 240.
        assert_ok!(TaskMarket::post_task(
            RuntimeOrigin::signed(BOB),
            1,
            b"ipfs://task".to_vec(),
            14
        ));
        assert_ok!(TaskMarket::propose_quote(
            RuntimeOrigin::signed(ALICE),
            1,
            14,
            240,
            START + 3_600
        ));
        fund_and_activate(asset, 1, 240);
        submit(1);
        open_default_dispute(1);

        assert_ok!(DisputeModule::resolve_dispute(
            RuntimeOrigin::signed(RESOLVER),
            1,
            DisputeOutcome::Split,
            b"ipfs://verdict".to_vec()
        ));

        assert_eq!(balance(asset, BOB), 10_000 - 240 + 120);
        assert_eq!(balance(asset, ALICE), 1_000 + 120);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn e2e_dispute_buyer_wins_takes_bond() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(5_000, true, 0, 10);

        // 2 units @ 10 + base 100 = 120; bond 50% = 60, seller-funded.
        let task_id = post_and_quote(2, 120);
        fund_own_bond(asset, task_id, 60);
        fund_and_activate(asset, task_id, 120);
        submit(task_id);
        open_default_dispute(task_id);

        assert_ok!(DisputeModule::resolve_dispute(
            RuntimeOrigin::signed(RESOLVER),
            task_id,
            DisputeOutcome::BuyerWins,
            b"ipfs://verdict".to_vec()
        ));

        // Buyer recovers escrow plus bond: 120 + 60.
        assert_eq!(balance(asset, BOB), 10_000 + 60);
        assert_eq!(balance(asset, ALICE), 1_000 - 60);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn e2e_agent_transfer_does_not_redirect_task() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(0, true, 0, 10);
        let task_id = post_and_quote(4, 140);
        fund_and_activate(asset, task_id, 140);

        assert_ok!(AgentIdentity::transfer_agent(
            RuntimeOrigin::signed(ALICE),
            1,
            DAVE
        ));

        assert_noop!(
            TaskMarket::submit_deliverable(
                RuntimeOrigin::signed(DAVE),
                task_id,
                b"ipfs://hijack".to_vec(),
                H256::zero()
            ),
            pallet_task_market::Error::<Test>::NotSeller
        );

        submit(task_id);
        assert_ok!(TaskMarket::accept_submission(
            RuntimeOrigin::signed(BOB),
            task_id
        ));

        // Payout lands with the snapshotted seller, not the new agent owner.
        assert_eq!(balance(asset, ALICE), 1_000 + 140);
        assert_eq!(balance(asset, DAVE), 0);
        assert_eq!(balance(asset, market()), 0);
    });
}

#[test]
fn e2e_post_dispute_timeout_settles_seller_wins() {
    new_test_ext().execute_with(|| {
        let asset = bootstrap(2_500, true, 300, 10);

        // Total 120, bond 25% = 30, seller-funded.
        let task_id = post_and_quote(2, 120);
        fund_own_bond(asset, task_id, 30);
        fund_and_activate(asset, task_id, 120);
        submit(task_id);
        open_default_dispute(task_id);

        let disputed_at = pallet_task_market::Tasks::<Test>::get(task_id)
            .unwrap()
            .disputed_at;
        set_now(disputed_at + 301);
        assert_ok!(TaskMarket::settle_after_post_dispute_timeout(
            RuntimeOrigin::signed(CHARLIE),
            task_id
        ));

        // Seller side keeps 120 escrow and the 30 bond comes home: net +120.
        assert_eq!(balance(asset, ALICE), 1_000 + 120);
        assert_eq!(balance(asset, BOB), 10_000 - 120);
        assert_eq!(balance(asset, market()), 0);

        System::assert_has_event(
            pallet_task_market::Event::<Test>::PostDisputeTimeoutSettled {
                task_id,
                deadline: disputed_at + 300,
                outcome: DisputeOutcome::SellerWins,
            }
            .into(),
        );

        // The record is still resolvable-looking but the market refuses a
        // second settlement.
        assert_noop!(
            DisputeModule::resolve_dispute(
                RuntimeOrigin::signed(RESOLVER),
                task_id,
                DisputeOutcome::BuyerWins,
                b"x".to_vec()
            ),
            pallet_task_market::Error::<Test>::InvalidTaskStatus
        );
    });
}
