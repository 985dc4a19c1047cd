//! ConnectionController: binds the selected signer and decides when the DApp
//! is connected.
//!
//! # Flow
//!
//! ```text
//! Extension ──SelectSigner──┐
//! Signer    ──Balance──────►│ inbox ──► run() / process_pending()
//! UI        ──Inbound──────┘              │
//!                                          ├── bind_identity      → signer-change
//!                                          ├── on_balance_update  → balance-value,
//!                                          │                        display-error | evm-connected,
//!                                          │                        clear-error, dapp-connected
//!                                          └── request_evm_bind   → tx-progress, tx-complete,
//!                                                                   evm-connected
//! ```
//!
//! Every input goes through one inbox and is handled to completion before the
//! next, so balance updates for a signer are applied in delivery order. Public
//! operations never fail: errors become `display-error` notices.

use futures::channel::mpsc;
use futures::StreamExt;
use std::cell::RefCell;
use std::rc::Rc;

use super::balance::Balance;
use super::bus::EventSink;
use super::config::DappConfig;
use super::error::{DappError, DappResult};
use super::events::{DappEvent, ErrorNotice, InboundEvent};
use super::signer::{Extension, ExtensionGateway, Signer, Subscription};
use super::state::{ConnectionState, Phase};

/// Work item for the controller loop
pub enum Command {
    SelectSigner(Option<Rc<dyn Signer>>),
    Balance { generation: u64, raw: String },
    Inbound(InboundEvent),
}

struct Inner {
    config: DappConfig,
    bus: Rc<dyn EventSink>,
    state: RefCell<ConnectionState>,
    inbox: mpsc::UnboundedSender<Command>,
    queue: RefCell<Option<mpsc::UnboundedReceiver<Command>>>,
    extension: RefCell<Option<(Rc<dyn Extension>, Subscription)>>,
}

/// Inbox receiver on loan to `run()`; returned to `slot` on drop
struct RunningQueue<'a> {
    slot: &'a RefCell<Option<mpsc::UnboundedReceiver<Command>>>,
    queue: Option<mpsc::UnboundedReceiver<Command>>,
}

impl RunningQueue<'_> {
    async fn next(&mut self) -> Option<Command> {
        match self.queue.as_mut() {
            Some(queue) => queue.next().await,
            None => None,
        }
    }
}

impl Drop for RunningQueue<'_> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            *self.slot.borrow_mut() = Some(queue);
        }
    }
}

/// Cheap to clone; clones drive the same state
#[derive(Clone)]
pub struct ConnectionController {
    inner: Rc<Inner>,
}

impl ConnectionController {
    pub fn new(config: DappConfig, bus: Rc<dyn EventSink>) -> DappResult<Self> {
        config.validate()?;
        let (inbox, queue) = mpsc::unbounded();
        Ok(Self {
            inner: Rc::new(Inner {
                config,
                bus,
                state: RefCell::new(ConnectionState::new()),
                inbox,
                queue: RefCell::new(Some(queue)),
                extension: RefCell::new(None),
            }),
        })
    }

    pub fn config(&self) -> &DappConfig {
        &self.inner.config
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    /// Cached EVM-claim flag of the bound signer (`None` until first checked)
    pub fn evm_claimed(&self) -> Option<bool> {
        self.inner.state.borrow().evm_claimed()
    }

    pub fn has_balance_subscription(&self) -> bool {
        self.inner.state.borrow().has_subscription()
    }

    pub fn selected_signer(&self) -> Option<Rc<dyn Signer>> {
        self.inner.state.borrow().current().map(|(signer, _)| signer)
    }

    // =========================================================================
    // INBOX
    // =========================================================================

    /// Queue a command for the loop
    pub fn send(&self, command: Command) {
        // the receiver lives as long as `inner`, so this only fails after run() ended
        let _ = self.inner.inbox.unbounded_send(command);
    }

    /// Queue a UI request
    pub fn dispatch(&self, event: InboundEvent) {
        self.send(Command::Inbound(event));
    }

    /// Process commands forever; the browser spawns this on load. While it runs
    /// `process_pending` sees an empty inbox. Dropping the future hands the
    /// inbox back.
    pub async fn run(&self) {
        let taken = self.inner.queue.borrow_mut().take();
        let Some(queue) = taken else {
            tracing::warn!("controller loop already running");
            return;
        };
        let mut running = RunningQueue { slot: &self.inner.queue, queue: Some(queue) };
        while let Some(command) = running.next().await {
            self.handle(command).await;
        }
    }

    /// Process whatever is queued right now, including commands queued while
    /// processing. Returns how many were handled.
    pub async fn process_pending(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.inner.queue.borrow_mut().as_mut() {
                Some(queue) => queue.try_next().ok().flatten(),
                None => None,
            };
            let Some(command) = next else { return handled };
            self.handle(command).await;
            handled += 1;
        }
    }

    pub async fn handle(&self, command: Command) {
        match command {
            Command::SelectSigner(Some(signer)) => self.bind_identity(signer).await,
            Command::SelectSigner(None) => self.report(&DappError::NoSelectedAccount),
            Command::Balance { generation, raw } => {
                let current = self.inner.state.borrow().current();
                match current {
                    Some((signer, bound)) if bound == generation => self.on_balance_update(&signer, &raw).await,
                    _ => tracing::debug!(generation, "dropping balance update from replaced signer"),
                }
            }
            Command::Inbound(InboundEvent::BindEvmAddress(address)) => self.request_evm_bind(&address).await,
            Command::Inbound(event) => {
                tracing::debug!(event = event.name(), "contract interaction not implemented; ignoring");
            }
        }
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Discover the wallet extension and follow its selected account
    pub async fn connect<G: ExtensionGateway + ?Sized>(&self, gateway: &G) {
        if let Err(err) = self.try_connect(gateway).await {
            self.report(&err);
        }
    }

    async fn try_connect<G: ExtensionGateway + ?Sized>(&self, gateway: &G) -> DappResult<()> {
        let extension = gateway.discover(&self.inner.config.app_name).await?;
        let inbox = self.inner.inbox.clone();
        let subscription = extension.on_selected_signer_changed(Box::new(move |signer| {
            let _ = inbox.unbounded_send(Command::SelectSigner(signer));
        }))?;
        tracing::info!(app = %self.inner.config.app_name, "wallet extension connected");
        // replacing an earlier extension subscription cancels it
        let previous = self.inner.extension.borrow_mut().replace((extension, subscription));
        drop(previous);
        Ok(())
    }

    /// Make `signer` the current identity and follow its balance
    pub async fn bind_identity(&self, signer: Rc<dyn Signer>) {
        if let Err(err) = self.try_bind_identity(signer).await {
            self.report(&err);
        }
    }

    async fn try_bind_identity(&self, signer: Rc<dyn Signer>) -> DappResult<()> {
        let (generation, previous) = self.inner.state.borrow_mut().select(signer.clone());
        if let Some(mut previous) = previous {
            previous.cancel();
        }

        let inbox = self.inner.inbox.clone();
        let subscription = signer
            .subscribe_balance(Box::new(move |raw| {
                let _ = inbox.unbounded_send(Command::Balance { generation, raw });
            }))
            .await?;
        let stale = self.inner.state.borrow_mut().attach_subscription(generation, subscription);
        if stale.is_some() {
            tracing::debug!(generation, "signer replaced while subscribing; dropping subscription");
            return Ok(());
        }

        let address = signer.address().await?;
        tracing::info!(%address, generation, "new signer");
        self.emit(DappEvent::SignerChange(address));
        Ok(())
    }

    /// Apply a raw balance delivered for `signer`
    pub async fn on_balance_update(&self, signer: &Rc<dyn Signer>, raw: &str) {
        if let Err(err) = self.try_balance_update(signer, raw).await {
            self.report(&err);
        }
    }

    async fn try_balance_update(&self, signer: &Rc<dyn Signer>, raw: &str) -> DappResult<()> {
        let generation = self.inner.state.borrow().generation_of(signer);
        let Some(generation) = generation else {
            tracing::debug!("balance update for a signer that is no longer selected");
            return Ok(());
        };

        let balance = Balance::from_raw(raw, self.inner.config.decimals)?;
        self.emit(DappEvent::BalanceValue(balance));

        let evm_connected = self.is_evm_connected(signer, generation).await?;
        if !self.is_current(generation) {
            return Ok(());
        }
        tracing::info!(balance = %balance, evm_connected, "signer balance");

        if evm_connected {
            self.set_phase(generation, Phase::EvmConnected);
            self.emit(DappEvent::EvmConnected);
        } else if balance.is_below(self.inner.config.funding_threshold) {
            let address = signer.address().await?;
            if !self.is_current(generation) {
                return Ok(());
            }
            self.set_phase(generation, Phase::AwaitingFunding);
            self.emit(DappEvent::DisplayError(ErrorNotice::Markup(
                self.inner.config.funding_advisory(&address),
            )));
            return Ok(());
        } else {
            self.set_phase(generation, Phase::IdentitySelected);
        }

        self.emit(DappEvent::ClearError);
        self.emit(DappEvent::DappConnected);
        Ok(())
    }

    /// Cached once true; otherwise asks the signer
    async fn is_evm_connected(&self, signer: &Rc<dyn Signer>, generation: u64) -> DappResult<bool> {
        if self.inner.state.borrow().known_claimed(generation) {
            return Ok(true);
        }
        let claimed = signer.is_evm_claimed().await?;
        self.inner.state.borrow_mut().record_evm_claim(generation, claimed);
        Ok(claimed)
    }

    /// Bind the default EVM address of the selected signer, if `address` is it
    pub async fn request_evm_bind(&self, address: &str) {
        if let Err(err) = self.try_evm_bind(address).await {
            self.report(&err);
        }
    }

    async fn try_evm_bind(&self, requested: &str) -> DappResult<()> {
        let current = self.inner.state.borrow().current();
        let (signer, generation) = current.ok_or(DappError::NoSigner)?;
        let selected = signer.address().await?;
        if requested != selected {
            return Err(DappError::SignerMismatch { selected, requested: requested.to_string() });
        }

        self.emit(DappEvent::TxProgress);
        signer.claim_evm_address().await?;
        {
            let mut state = self.inner.state.borrow_mut();
            state.record_evm_claim(generation, true);
            state.set_phase(generation, Phase::EvmConnected);
        }
        tracing::info!(address = %selected, "EVM address claimed");
        self.emit(DappEvent::TxComplete);
        self.emit(DappEvent::EvmConnected);
        Ok(())
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.borrow().is_current(generation)
    }

    fn set_phase(&self, generation: u64, phase: Phase) {
        self.inner.state.borrow_mut().set_phase(generation, phase);
    }

    fn emit(&self, event: DappEvent) {
        self.inner.bus.emit(event);
    }

    fn report(&self, err: &DappError) {
        tracing::warn!(error = %err, "reporting error");
        self.emit(DappEvent::DisplayError(ErrorNotice::from(err)));
    }
}
