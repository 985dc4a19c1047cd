//! Connection state: which signer is bound, its balance subscription, and
//! whether it has an EVM address.

use std::fmt;
use std::rc::Rc;

use super::signer::{same_signer, Signer, Subscription};

/// Where the DApp stands with the selected signer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Disconnected,
    IdentitySelected,
    AwaitingFunding,
    EvmConnected,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Disconnected => "disconnected",
            Phase::IdentitySelected => "identity-selected",
            Phase::AwaitingFunding => "awaiting-funding",
            Phase::EvmConnected => "evm-connected",
        }
    }
}

/// Owned by the controller; lives for the whole tab session.
///
/// Each bound signer gets a fresh generation. Balance callbacks carry the
/// generation they were created for, so updates from a replaced signer can be
/// recognised and dropped.
#[derive(Default)]
pub struct ConnectionState {
    signer: Option<Rc<dyn Signer>>,
    generation: u64,
    evm_claimed: Option<bool>,
    subscription: Option<Subscription>,
    phase: Phase,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `signer`, returning the new generation and the previous subscription
    /// (if any) for the caller to cancel.
    pub fn select(&mut self, signer: Rc<dyn Signer>) -> (u64, Option<Subscription>) {
        self.generation += 1;
        self.signer = Some(signer);
        self.evm_claimed = None;
        self.phase = Phase::IdentitySelected;
        (self.generation, self.subscription.take())
    }

    /// Store the subscription opened for `generation`. Hands it back if that
    /// signer has been replaced in the meantime.
    pub fn attach_subscription(&mut self, generation: u64, subscription: Subscription) -> Option<Subscription> {
        if generation != self.generation {
            return Some(subscription);
        }
        let previous = self.subscription.replace(subscription);
        debug_assert!(previous.is_none(), "one live balance subscription per signer");
        previous
    }

    pub fn current(&self) -> Option<(Rc<dyn Signer>, u64)> {
        self.signer.as_ref().map(|s| (s.clone(), self.generation))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.signer.is_some() && generation == self.generation
    }

    /// Generation of `signer` if it is the one currently bound
    pub fn generation_of(&self, signer: &Rc<dyn Signer>) -> Option<u64> {
        match &self.signer {
            Some(current) if same_signer(current, signer) => Some(self.generation),
            _ => None,
        }
    }

    /// Sticky: once a signer is seen claimed it stays claimed until rebinding
    pub fn known_claimed(&self, generation: u64) -> bool {
        self.is_current(generation) && self.evm_claimed == Some(true)
    }

    pub fn record_evm_claim(&mut self, generation: u64, claimed: bool) {
        if self.is_current(generation) && self.evm_claimed != Some(true) {
            self.evm_claimed = Some(claimed);
        }
    }

    pub fn set_phase(&mut self, generation: u64, phase: Phase) {
        if !self.is_current(generation) {
            return;
        }
        // EVM connection never regresses for the same signer
        if self.phase == Phase::EvmConnected && phase != Phase::EvmConnected {
            return;
        }
        self.phase = phase;
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn generation(&self) -> u64 { self.generation }
    pub fn evm_claimed(&self) -> Option<bool> { self.evm_claimed }

    pub fn has_subscription(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("bound", &self.signer.is_some())
            .field("generation", &self.generation)
            .field("evm_claimed", &self.evm_claimed)
            .field("subscription", &self.subscription)
            .field("phase", &self.phase)
            .finish()
    }
}
