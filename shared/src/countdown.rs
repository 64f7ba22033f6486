//! Send/cancel countdown.
//!
//! Each run is tagged with a [`Generation`]. Ticks carry the generation
//! they were scheduled for, so a tick from a cancelled run, or a duplicate
//! tick at the boundary, finds no matching `Confirming` state and is
//! dropped. Expiry replaces `Confirming` with `Sent` in one step, which is
//! what makes submission happen exactly once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::RecordKey;
use crate::COUNTDOWN_SECONDS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    #[default]
    InFlight,
    Delivered(RecordKey),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Countdown {
    #[default]
    Idle,
    Confirming {
        remaining: u8,
        generation: Generation,
    },
    Sent {
        delivery: Delivery,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Continue { remaining: u8 },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("a countdown is already running")]
    AlreadyConfirming,
    #[error("a report is waiting for a response")]
    AwaitingResponse,
}

impl Countdown {
    pub fn start(&mut self, generation: Generation) -> Result<(), CountdownError> {
        match self {
            Self::Idle => {
                *self = Self::Confirming {
                    remaining: COUNTDOWN_SECONDS,
                    generation,
                };
                Ok(())
            }
            Self::Confirming { .. } => Err(CountdownError::AlreadyConfirming),
            Self::Sent { .. } => Err(CountdownError::AwaitingResponse),
        }
    }

    pub fn tick(&mut self, generation: Generation) -> TickOutcome {
        match *self {
            Self::Confirming {
                remaining,
                generation: current,
            } if current == generation => {
                if remaining <= 1 {
                    *self = Self::Sent {
                        delivery: Delivery::InFlight,
                    };
                    TickOutcome::Expired
                } else {
                    let remaining = remaining - 1;
                    *self = Self::Confirming {
                        remaining,
                        generation,
                    };
                    TickOutcome::Continue { remaining }
                }
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// Returns the cancelled generation, or `None` if nothing was running.
    pub fn cancel(&mut self) -> Option<Generation> {
        match *self {
            Self::Confirming { generation, .. } => {
                *self = Self::Idle;
                Some(generation)
            }
            _ => None,
        }
    }

    pub fn delivered(&mut self, key: RecordKey) {
        if let Self::Sent { delivery } = self {
            *delivery = Delivery::Delivered(key);
        }
    }

    /// Submission failed; the user may press send again.
    pub fn failed(&mut self) {
        if matches!(self, Self::Sent { .. }) {
            *self = Self::Idle;
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> Option<u8> {
        match self {
            Self::Confirming { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_confirming(&self) -> bool {
        matches!(self, Self::Confirming { .. })
    }

    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}
