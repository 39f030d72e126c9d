//! Handshake state machine
//!
//! The host greets the adapter with [`crate::codec::GREETING_REQUEST`] until
//! the board answers with [`crate::codec::GREETING_REPLY`]. The state is
//! shared between the probing caller and the read loop, which is the only
//! place the reply can be observed.
//!
//! `Confirmed` is terminal; the reply may arrive even before anyone started
//! probing (adapter already booted and chatty), so `confirm` is valid from
//! any state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    Probing,
    Confirmed,
}

const NOT_STARTED: u8 = 0;
const PROBING: u8 = 1;
const CONFIRMED: u8 = 2;

/// Handshake state shared between the prober and the read loop
#[derive(Debug)]
pub(crate) struct HandshakeShared {
    state: AtomicU8,
}

impl HandshakeShared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
        }
    }

    pub(crate) fn state(&self) -> HandshakeState {
        match self.state.load(Ordering::Acquire) {
            NOT_STARTED => HandshakeState::NotStarted,
            PROBING => HandshakeState::Probing,
            _ => HandshakeState::Confirmed,
        }
    }

    /// `NotStarted -> Probing`; no-op once probing or confirmed
    pub(crate) fn begin_probing(&self) {
        let _ = self.state.compare_exchange(
            NOT_STARTED,
            PROBING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Terminal transition, valid from any state
    pub(crate) fn confirm(&self) {
        self.state.store(CONFIRMED, Ordering::Release);
    }

    pub(crate) fn is_confirmed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CONFIRMED
    }
}
