//! Controller Test Suite: connection rules against in-memory collaborators
//!
//! 1. Funded, unclaimed signer → dapp-connected, never evm-connected
//! 2. Unfunded, unclaimed signer → funding advisory, no dapp-connected
//! 3. Claimed signer → evm-connected + dapp-connected at any balance
//! 4. EVM-claim cache is sticky
//! 5. Rebinding cancels the previous balance subscription
//! 6. EVM bind: mismatch, success, failure
//! 7. Extension discovery and selection
//! 8. Command loop ordering
//! 9. Signer replaced while a signer call is in flight

use futures::channel::mpsc::UnboundedReceiver;
use reefdapp::core::bus::drain;
use reefdapp::{
    Balance, ChannelBus, Command, ConnectionController, DappConfig, DappEvent, ErrorNotice, InboundEvent,
    MemoryExtension, MemoryGateway, MemorySigner, Phase, Signer,
};
use std::rc::Rc;
use std::time::Duration;

const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

// 12 decimals: "2000000000000" normalizes to 2
const TWO: &str = "2000000000000";
const FIVE: &str = "5000000000000";

fn setup() -> (ConnectionController, UnboundedReceiver<DappEvent>) {
    let bus = ChannelBus::new();
    let events = bus.subscribe();
    let config = DappConfig::new("controller-test").with_decimals(12);
    let controller = ConnectionController::new(config, Rc::new(bus)).expect("controller");
    (controller, events)
}

fn names(events: &[DappEvent]) -> Vec<&'static str> {
    events.iter().map(DappEvent::name).collect()
}

fn balance(raw: &str) -> DappEvent {
    DappEvent::BalanceValue(Balance::from_raw(raw, 12).expect("balance"))
}

async fn bind(controller: &ConnectionController, signer: &MemorySigner) -> Rc<dyn Signer> {
    let handle: Rc<dyn Signer> = Rc::new(signer.clone());
    controller.bind_identity(handle.clone()).await;
    handle
}

/// Test 1: balance ≥ 3 and unclaimed → balance-value, clear-error, dapp-connected
#[tokio::test]
async fn funded_unclaimed_signer_connects_without_evm() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(FIVE);
    bind(&controller, &alice).await;
    assert_eq!(drain(&mut events), vec![DappEvent::SignerChange(ALICE.into())]);

    assert_eq!(controller.process_pending().await, 1);
    let emitted = drain(&mut events);
    assert_eq!(emitted, vec![balance(FIVE), DappEvent::ClearError, DappEvent::DappConnected]);
    assert_eq!(controller.phase(), Phase::IdentitySelected);
    assert_eq!(controller.evm_claimed(), Some(false));

    // exactly at the threshold still counts as funded
    alice.push_balance("3000000000000");
    controller.process_pending().await;
    assert_eq!(names(&drain(&mut events)), vec!["balance-value", "clear-error", "dapp-connected"]);
}

/// Test 2: balance < 3 and unclaimed → advisory, returns before dapp-connected
#[tokio::test]
async fn unfunded_unclaimed_signer_gets_funding_advisory() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(TWO);
    bind(&controller, &alice).await;
    drain(&mut events);

    controller.process_pending().await;
    let emitted = drain(&mut events);
    assert_eq!(names(&emitted), vec!["balance-value", "display-error"]);
    assert_eq!(emitted[0], balance(TWO));
    match &emitted[1] {
        DappEvent::DisplayError(ErrorNotice::Markup(text)) => {
            assert!(text.contains(&format!("!drip {}", ALICE)));
            assert!(text.contains("~3REEF"));
        }
        other => panic!("expected funding advisory, got {:?}", other),
    }
    assert_eq!(controller.phase(), Phase::AwaitingFunding);
}

/// Test 3: claimed → evm-connected and dapp-connected regardless of balance
#[tokio::test]
async fn claimed_signer_is_evm_connected_at_any_balance() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_evm_claimed(true).with_balance("0");
    bind(&controller, &alice).await;
    drain(&mut events);

    for raw in ["1", TWO, FIVE] {
        alice.push_balance(raw);
    }
    assert_eq!(controller.process_pending().await, 4);

    let emitted = drain(&mut events);
    assert_eq!(emitted.len(), 16);
    for (chunk, raw) in emitted.chunks(4).zip(["0", "1", TWO, FIVE]) {
        assert_eq!(chunk, &[balance(raw), DappEvent::EvmConnected, DappEvent::ClearError, DappEvent::DappConnected]);
    }
    assert_eq!(controller.phase(), Phase::EvmConnected);
}

/// Test 4: once claimed is observed true, the signer is never asked again
#[tokio::test]
async fn evm_claim_cache_is_sticky() {
    let (controller, _events) = setup();
    let alice = MemorySigner::new(ALICE).with_evm_claimed(true).with_balance(FIVE);
    bind(&controller, &alice).await;
    controller.process_pending().await;
    assert_eq!(alice.claimed_checks(), 1);

    // even if the chain later reports otherwise
    alice.set_evm_claimed(false);
    alice.push_balance(TWO);
    alice.push_balance(FIVE);
    controller.process_pending().await;
    assert_eq!(alice.claimed_checks(), 1);
    assert_eq!(controller.evm_claimed(), Some(true));
    assert_eq!(controller.phase(), Phase::EvmConnected);

    // unclaimed results are not cached: asked on every update
    let bob = MemorySigner::new(BOB).with_balance(FIVE);
    bind(&controller, &bob).await;
    controller.process_pending().await;
    bob.push_balance(FIVE);
    controller.process_pending().await;
    assert_eq!(bob.claimed_checks(), 2);
}

/// Test 5: rebinding cancels the old subscription before opening a new one
#[tokio::test]
async fn rebinding_cancels_previous_subscription() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE);
    let bob = MemorySigner::new(BOB);

    bind(&controller, &alice).await;
    assert_eq!(alice.live_subscriptions(), 1);
    assert!(controller.has_balance_subscription());

    bind(&controller, &bob).await;
    assert_eq!(alice.live_subscriptions(), 0);
    assert_eq!(bob.live_subscriptions(), 1);
    assert!(controller.has_balance_subscription());
    drain(&mut events);

    alice.push_balance(FIVE);
    assert_eq!(controller.process_pending().await, 0);
    assert!(drain(&mut events).is_empty());
}

/// Test 5b: updates queued for a replaced signer are discarded
#[tokio::test]
async fn stale_balance_updates_are_dropped() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE);
    let alice_handle = bind(&controller, &alice).await;
    alice.push_balance(FIVE);

    let bob = MemorySigner::new(BOB).with_balance(TWO);
    bind(&controller, &bob).await;
    drain(&mut events);

    assert_eq!(controller.process_pending().await, 2);
    let emitted = drain(&mut events);
    assert_eq!(names(&emitted), vec!["balance-value", "display-error"]);
    assert_eq!(emitted[0], balance(TWO));
    assert_eq!(alice.claimed_checks(), 0);

    // direct calls for the old signer are ignored too
    controller.on_balance_update(&alice_handle, FIVE).await;
    controller.send(Command::Balance { generation: 1, raw: FIVE.into() });
    controller.process_pending().await;
    assert!(drain(&mut events).is_empty());
}

/// Test 6a: bind request for another address → only an error, no claim
#[tokio::test]
async fn evm_bind_rejects_other_address() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE);
    bind(&controller, &alice).await;
    drain(&mut events);

    controller.request_evm_bind(BOB).await;
    assert_eq!(
        drain(&mut events),
        vec![DappEvent::DisplayError(ErrorNotice::message(
            "Error connecting EVM. Selected signer is not the same."
        ))]
    );
    assert_eq!(alice.claim_calls(), 0);
}

/// Test 6b: matching bind → tx-progress, tx-complete, evm-connected
#[tokio::test]
async fn evm_bind_claims_selected_signer() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(FIVE);
    bind(&controller, &alice).await;
    controller.process_pending().await;
    let checks_before = alice.claimed_checks();
    drain(&mut events);

    controller.dispatch(InboundEvent::BindEvmAddress(ALICE.into()));
    controller.process_pending().await;
    assert_eq!(
        drain(&mut events),
        vec![DappEvent::TxProgress, DappEvent::TxComplete, DappEvent::EvmConnected]
    );
    assert_eq!(alice.claim_calls(), 1);
    assert_eq!(controller.phase(), Phase::EvmConnected);

    // later balances use the cached claim
    alice.push_balance(TWO);
    controller.process_pending().await;
    assert_eq!(alice.claimed_checks(), checks_before);
    assert_eq!(names(&drain(&mut events)), vec!["balance-value", "evm-connected", "clear-error", "dapp-connected"]);
}

/// Test 6c: failed claim → error after tx-progress, no completion
#[tokio::test]
async fn evm_bind_failure_is_reported() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).failing_claim("1010: Invalid Transaction");
    bind(&controller, &alice).await;
    drain(&mut events);

    controller.request_evm_bind(ALICE).await;
    assert_eq!(
        drain(&mut events),
        vec![
            DappEvent::TxProgress,
            DappEvent::DisplayError(ErrorNotice::message("EVM claim failed: 1010: Invalid Transaction")),
        ]
    );
    assert_eq!(controller.phase(), Phase::IdentitySelected);
}

/// Test 6d: bind request before any signer is selected
#[tokio::test]
async fn evm_bind_without_signer() {
    let (controller, mut events) = setup();
    controller.request_evm_bind(ALICE).await;
    assert_eq!(drain(&mut events), vec![DappEvent::DisplayError(ErrorNotice::message("No signer selected"))]);
}

/// Scenario: 2 REEF → advisory; later 5 REEF → advisory cleared, connected
#[tokio::test]
async fn funding_scenario_clears_advisory() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(TWO);
    bind(&controller, &alice).await;
    controller.process_pending().await;
    let first = drain(&mut events);
    assert_eq!(names(&first), vec!["signer-change", "balance-value", "display-error"]);

    alice.push_balance(FIVE);
    controller.process_pending().await;
    assert_eq!(
        drain(&mut events),
        vec![balance(FIVE), DappEvent::ClearError, DappEvent::DappConnected]
    );
    assert_eq!(controller.phase(), Phase::IdentitySelected);
}

/// Test 7a: missing extension is reported, nothing else happens
#[tokio::test]
async fn missing_extension_is_reported() {
    let (controller, mut events) = setup();
    controller.connect(&MemoryGateway::missing()).await;
    assert_eq!(
        drain(&mut events),
        vec![DappEvent::DisplayError(ErrorNotice::message(
            "Reef extension unavailable: Install Reef Chain Wallet extension"
        ))]
    );
    assert_eq!(controller.phase(), Phase::Disconnected);
}

/// Test 7b: hidden account → guidance; selecting one later binds it
#[tokio::test]
async fn extension_selection_drives_binding() {
    let (controller, mut events) = setup();
    let extension = MemoryExtension::new();
    extension.select(None);
    controller.connect(&MemoryGateway::new(extension.clone())).await;
    controller.process_pending().await;
    assert_eq!(
        drain(&mut events),
        vec![DappEvent::DisplayError(ErrorNotice::message(
            "Create account in Reef extension or make selected account visible."
        ))]
    );

    let alice = MemorySigner::new(ALICE).with_balance(FIVE);
    extension.select(Some(alice.clone()));
    controller.process_pending().await;
    assert_eq!(
        names(&drain(&mut events)),
        vec!["signer-change", "balance-value", "clear-error", "dapp-connected"]
    );

    let bob = MemorySigner::new(BOB);
    extension.select(Some(bob.clone()));
    controller.process_pending().await;
    assert_eq!(drain(&mut events), vec![DappEvent::SignerChange(BOB.into())]);
    assert_eq!(alice.live_subscriptions(), 0);
    assert_eq!(bob.live_subscriptions(), 1);
}

/// Test 7c: subscription and balance errors become notices
#[tokio::test]
async fn collaborator_failures_become_notices() {
    let (controller, mut events) = setup();
    let broken = MemorySigner::new(ALICE).failing_subscribe("api disconnected");
    bind(&controller, &broken).await;
    assert_eq!(
        drain(&mut events),
        vec![DappEvent::DisplayError(ErrorNotice::message("Balance subscription failed: api disconnected"))]
    );
    assert!(!controller.has_balance_subscription());

    let alice = MemorySigner::new(ALICE).with_balance("12.5");
    bind(&controller, &alice).await;
    controller.process_pending().await;
    assert_eq!(
        names(&drain(&mut events)),
        vec!["signer-change", "display-error"]
    );
}

/// Test 8: contract events are ignored; the run loop handles queued work in order
#[tokio::test]
async fn run_loop_processes_in_order() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(TWO);
    let extension = MemoryExtension::new();
    extension.select(Some(alice.clone()));
    controller.connect(&MemoryGateway::new(extension)).await;
    controller.dispatch(InboundEvent::GetContractValue);
    controller.dispatch(InboundEvent::ToggleContractValue);
    controller.dispatch(InboundEvent::BindEvmAddress(ALICE.into()));

    let finished = tokio::time::timeout(Duration::from_millis(50), controller.run()).await;
    assert!(finished.is_err(), "run() waits for more commands");

    assert_eq!(
        names(&drain(&mut events)),
        vec![
            "signer-change",
            // the bind request was queued before the first balance arrived
            "tx-progress",
            "tx-complete",
            "evm-connected",
            "balance-value",
            "evm-connected",
            "clear-error",
            "dapp-connected",
        ]
    );
    assert_eq!(controller.phase(), Phase::EvmConnected);

    // the inbox survives the dropped loop
    alice.push_balance(FIVE);
    assert_eq!(controller.process_pending().await, 1);
    assert_eq!(names(&drain(&mut events)), vec!["balance-value", "evm-connected", "clear-error", "dapp-connected"]);
}

/// Test 7d: failing signer lookups during a balance update become notices
#[tokio::test]
async fn signer_lookup_failures_become_notices() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(FIVE).failing_claimed_check("chain unreachable");
    bind(&controller, &alice).await;
    controller.process_pending().await;
    assert_eq!(
        drain(&mut events),
        vec![
            DappEvent::SignerChange(ALICE.into()),
            balance(FIVE),
            DappEvent::DisplayError(ErrorNotice::message("Signer error: chain unreachable")),
        ]
    );
    assert_eq!(controller.evm_claimed(), None);

    let bob = MemorySigner::new(BOB).with_balance(TWO).failing_address("account locked");
    bind(&controller, &bob).await;
    controller.process_pending().await;
    let locked = DappEvent::DisplayError(ErrorNotice::message("Signer error: account locked"));
    // once while binding, once when the advisory needs the address
    assert_eq!(drain(&mut events), vec![locked.clone(), balance(TWO), locked]);
    assert_eq!(controller.phase(), Phase::IdentitySelected);
}

/// Test 9a: rebinding while the EVM-claim query is pending drops its result
#[tokio::test]
async fn rebinding_during_claim_check_discards_result() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_evm_claimed(true).with_balance(FIVE);
    bind(&controller, &alice).await;
    drain(&mut events);

    let release = alice.hold_next_claimed_check();
    let bob = MemorySigner::new(BOB);
    let (handled, ()) = futures::join!(controller.process_pending(), async {
        bind(&controller, &bob).await;
        let _ = release.send(());
    });

    assert_eq!(handled, 1);
    assert_eq!(names(&drain(&mut events)), vec!["balance-value", "signer-change"]);
    assert_eq!(alice.claimed_checks(), 1);
    assert_eq!(controller.evm_claimed(), None);
    assert_eq!(controller.phase(), Phase::IdentitySelected);
}

/// Test 9b: rebinding while the advisory's address lookup is pending drops the advisory
#[tokio::test]
async fn rebinding_during_address_lookup_discards_advisory() {
    let (controller, mut events) = setup();
    let alice = MemorySigner::new(ALICE).with_balance(TWO);
    bind(&controller, &alice).await;
    drain(&mut events);

    let release = alice.hold_next_address();
    let bob = MemorySigner::new(BOB);
    let (handled, ()) = futures::join!(controller.process_pending(), async {
        bind(&controller, &bob).await;
        let _ = release.send(());
    });

    assert_eq!(handled, 1);
    assert_eq!(names(&drain(&mut events)), vec!["balance-value", "signer-change"]);
    assert_eq!(controller.phase(), Phase::IdentitySelected);
}
