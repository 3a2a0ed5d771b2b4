//! Gamepad snapshots and the per-device polling loop.
//!
//! Hosts expose their gamepads through [`GamepadSource`]. When a device shows up the host calls
//! [`spawn_gamepad_poller`], which mirrors the device into the engine's input channel on its own
//! cadence, independent of the frame scheduler.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::{InputListener, RawInput};

/// State of one gamepad button at the time of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ButtonSnapshot {
    pub pressed: bool,
    pub value: f32,
}

/// Everything known about one gamepad at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GamepadSnapshot {
    pub index: usize,
    /// Device description reported by the host.
    pub id: String,
    pub axes: Vec<f32>,
    pub buttons: Vec<ButtonSnapshot>,
}

impl GamepadSnapshot {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            axes: Vec::new(),
            buttons: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_axes(mut self, axes: Vec<f32>) -> Self {
        self.axes = axes;
        self
    }

    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<ButtonSnapshot>) -> Self {
        self.buttons = buttons;
        self
    }

    /// True if any axis is pushed past `deadzone`.
    pub fn axis_active(&self, deadzone: f32) -> bool {
        self.axes.iter().any(|a| a.abs() > deadzone)
    }
}

/// Host capability returning the live state of a gamepad slot.
pub trait GamepadSource: Send + 'static {
    /// `None` once the device is gone.
    fn snapshot(&self, index: usize) -> Option<GamepadSnapshot>;
}

/// Start mirroring gamepad `index` into the engine.
///
/// The first snapshot is delivered as a connect event, later ones as polls. The thread ends and
/// reports a disconnect when the source stops returning snapshots, or quietly when the engine
/// side of the channel has been dropped.
pub fn spawn_gamepad_poller<S: GamepadSource>(
    source: S,
    index: usize,
    listener: InputListener,
    cadence: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let Some(first) = source.snapshot(index) else {
            log::warn!("gamepad {index} disappeared before polling started");
            return;
        };
        log::info!("gamepad {index} connected: {}", first.id);
        if !listener.send(RawInput::GamepadConnected(first)) {
            return;
        }
        loop {
            thread::sleep(cadence);
            match source.snapshot(index) {
                Some(snapshot) => {
                    if !listener.send(RawInput::GamepadPolled(snapshot)) {
                        return;
                    }
                }
                None => {
                    log::info!("gamepad {index} disconnected");
                    listener.send(RawInput::GamepadDisconnected { index });
                    return;
                }
            }
        }
    })
}
