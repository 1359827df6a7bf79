//! The operator's light gun.
//!
//! The gun never looks anything up.  The operator arms it at a scope
//! position; the program then draws candidate points one at a time, and
//! the first one drawn close enough to the gun "flashes", which latches
//! its id and raises the `LG` drum channel.  The program sees the
//! channel with SNS and the host collects the id with
//! [`LightGun::poll_and_clear`].
//!
//! ```text
//! Disarmed --arm--> Armed --matching draw--> FlashPending --poll--> Disarmed
//! ```

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::io::drum::{Channel, Drum};
use crate::onescomplement::half;

/// Largest distance, in scope units, at which a drawn point is detected.
pub const DETECTION_RADIUS: f64 = 8.0;

/// Width and height of the scope face in scope units.
pub const SCOPE_SIZE: f64 = 1024.0;

/// Map a half-word fraction in [-1, 1) to a scope coordinate in [0, 1024).
pub fn scope_coordinate(value: u16) -> f64 {
    (half::to_fraction(value) + 1.0) * SCOPE_SIZE / 2.0
}

/// Where the gun is in its cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightGunState<Id> {
    Disarmed,
    Armed { x: f64, y: f64 },
    FlashPending { x: f64, y: f64, id: Id },
}

/// Light gun, generic over the id the program attaches to each point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightGun<Id> {
    state: LightGunState<Id>,
}

impl<Id: Clone + Debug> LightGun<Id> {
    /// A disarmed gun.
    pub fn new() -> Self {
        Self {
            state: LightGunState::Disarmed,
        }
    }

    /// Current state.
    pub fn state(&self) -> &LightGunState<Id> {
        &self.state
    }

    /// Aim the gun at (x, y).  Any stale flash is discarded and the LG
    /// channel lowered.
    pub fn arm(&mut self, drum: &mut Drum, x: f64, y: f64) {
        event!(Level::DEBUG, x, y, "light gun armed");
        self.state = LightGunState::Armed { x, y };
        drum.clear_status(Channel::LightGun);
    }

    /// Offer a drawn point.  Returns true if this point is the one the
    /// gun detected.
    pub fn draw_event(&mut self, drum: &mut Drum, id: Id, x: f64, y: f64) -> bool {
        let LightGunState::Armed { x: gx, y: gy } = self.state else {
            return false;
        };
        if (x - gx).hypot(y - gy) > DETECTION_RADIUS {
            return false;
        }

        event!(Level::DEBUG, ?id, x, y, "light gun flash");
        self.state = LightGunState::FlashPending { x: gx, y: gy, id };
        drum.set_status(Channel::LightGun);
        true
    }

    /// Collect the detected id, if any, and disarm.
    pub fn poll_and_clear(&mut self, drum: &mut Drum) -> Option<Id> {
        match std::mem::replace(&mut self.state, LightGunState::Disarmed) {
            LightGunState::FlashPending { id, .. } => {
                event!(Level::DEBUG, ?id, "light gun polled");
                drum.clear_status(Channel::LightGun);
                Some(id)
            }
            other => {
                self.state = other;
                None
            }
        }
    }
}

impl<Id: Clone + Debug> Default for LightGun<Id> {
    fn default() -> Self {
        Self::new()
    }
}
