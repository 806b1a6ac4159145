//! Client lifecycle state

use std::sync::atomic::{AtomicU8, Ordering};

/// Gateway client state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientState {
    /// Not connected, `start()` may be called
    Idle = 0,
    /// Resolving the gateway URL
    Connecting = 1,
    /// Waiting for Hello
    Handshaking = 2,
    /// Session live, events flowing
    Active = 3,
    /// Tearing down the previous session before connecting again
    Reconnecting = 4,
    /// Cancelled, terminal
    Closed = 5,
}

impl ClientState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Handshaking,
            3 => Self::Active,
            4 => Self::Reconnecting,
            5 => Self::Closed,
            _ => Self::Idle,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Handshaking => "Handshaking",
            Self::Active => "Active",
            Self::Reconnecting => "Reconnecting",
            Self::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Atomic cell holding a [`ClientState`]
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new(state: ClientState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> ClientState {
        ClientState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Store a new state unless the cell is already `Closed`, returning the previous state
    pub(crate) fn set(&self, state: ClientState) -> ClientState {
        let previous = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != ClientState::Closed as u8).then_some(state as u8)
            })
            .unwrap_or_else(|closed| closed);
        ClientState::from_u8(previous)
    }

    pub(crate) fn close(&self) -> ClientState {
        ClientState::from_u8(self.0.swap(ClientState::Closed as u8, Ordering::SeqCst))
    }
}
