use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};

use crate::engine::EngineContext;
use crate::gamepad::GamepadSnapshot;
use crate::math::Vec2;

/// Pseudo-key flagged whenever the mouse moved since the last tick.
pub const MOUSE_POSITION_KEY: &str = "getMousePosition";

/// Key id of a mouse button, using DOM button indices (0 left, 1 middle, 2 right).
pub fn mouse_button_key(button: u8) -> String {
    format!("mouse{button}")
}

pub fn gamepad_button_key(index: usize, button: usize) -> String {
    format!("gamepad{index}_button{button}")
}

/// Key id shared by all axes of one gamepad.
pub fn gamepad_axis_key(index: usize) -> String {
    format!("gamepad{index}_axis")
}

/// Raw event coming from a host listener.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    KeyDown(String),
    KeyUp(String),
    MouseDown { button: u8, position: Vec2 },
    MouseUp { button: u8, position: Vec2 },
    MouseMove { position: Vec2 },
    TouchStart { id: u64, position: Vec2 },
    TouchMove { id: u64, position: Vec2 },
    TouchEnd { id: u64 },
    GamepadConnected(GamepadSnapshot),
    GamepadPolled(GamepadSnapshot),
    GamepadDisconnected { index: usize },
    /// A UI panel's markup emitted `event`; dispatched to the panel's handler.
    Ui { tag: String, event: String },
}

/// Cloneable, thread-safe handle used by host listeners to feed raw input to the engine.
///
/// Listeners only enqueue; everything is applied at the start of the next tick.
#[derive(Clone, Debug)]
pub struct InputListener {
    sender: Sender<RawInput>,
}

impl InputListener {
    pub(crate) fn channel() -> (Self, Receiver<RawInput>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Enqueue a raw event. Returns false once the engine is gone.
    pub fn send(&self, input: RawInput) -> bool {
        self.sender.send(input).is_ok()
    }

    pub fn key_down(&self, key: impl Into<String>) {
        self.send(RawInput::KeyDown(key.into()));
    }

    pub fn key_up(&self, key: impl Into<String>) {
        self.send(RawInput::KeyUp(key.into()));
    }

    pub fn mouse_down(&self, button: u8, position: Vec2) {
        self.send(RawInput::MouseDown { button, position });
    }

    pub fn mouse_up(&self, button: u8, position: Vec2) {
        self.send(RawInput::MouseUp { button, position });
    }

    pub fn mouse_move(&self, position: Vec2) {
        self.send(RawInput::MouseMove { position });
    }

    pub fn ui_event(&self, tag: impl Into<String>, event: impl Into<String>) {
        self.send(RawInput::Ui {
            tag: tag.into(),
            event: event.into(),
        });
    }
}

/// What produced the last mouse snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Down(u8),
    Up(u8),
    Move,
}

/// Last mouse event seen by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseSnapshot {
    pub position: Vec2,
    pub kind: MouseEventKind,
}

/// Normalized view of every raw input channel.
///
/// Only the input subsystem writes to it; scenes and callbacks read it through
/// [`EngineContext::input`].
#[derive(Clone, Debug, Default)]
pub struct InputState {
    keyboard: HashMap<String, bool>,
    mouse: Option<MouseSnapshot>,
    gamepads: Vec<Option<GamepadSnapshot>>,
}

impl InputState {
    /// Returns true if the key is currently held down.
    pub fn is_key_down(&self, key: &str) -> bool {
        self.keyboard.get(key).copied().unwrap_or(false)
    }

    /// Last mouse event, if the mouse was ever used.
    pub fn mouse(&self) -> Option<&MouseSnapshot> {
        self.mouse.as_ref()
    }

    /// Current mouse cursor position as a Vec2.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse.map(|m| m.position).unwrap_or(Vec2::ZERO)
    }

    pub fn gamepad(&self, index: usize) -> Option<&GamepadSnapshot> {
        self.gamepads.get(index).and_then(Option::as_ref)
    }

    /// Connected gamepads in slot order.
    pub fn gamepads(&self) -> impl Iterator<Item = &GamepadSnapshot> {
        self.gamepads.iter().flatten()
    }

    fn store_gamepad(&mut self, snapshot: GamepadSnapshot) {
        let index = snapshot.index;
        if self.gamepads.len() <= index {
            self.gamepads.resize(index + 1, None);
        }
        self.gamepads[index] = Some(snapshot);
    }
}

/// Callback attached to a key-state entry.
pub type KeyCallback = Rc<dyn Fn(&mut EngineContext)>;

struct KeyBinding {
    pressed: bool,
    on_start: KeyCallback,
    on_stop: KeyCallback,
}

/// Key id → pressed flag plus the two callbacks polled once per tick.
#[derive(Default)]
pub struct KeyStateTable {
    entries: BTreeMap<String, KeyBinding>,
}

impl KeyStateTable {
    /// Register or replace the binding for `key`. New bindings start released.
    pub fn insert(&mut self, key: impl Into<String>, on_start: KeyCallback, on_stop: KeyCallback) {
        self.entries.insert(
            key.into(),
            KeyBinding {
                pressed: false,
                on_start,
                on_stop,
            },
        );
    }

    /// Remove a binding. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.entries.get(key).map(|b| b.pressed).unwrap_or(false)
    }

    /// Update the pressed flag of a registered key. Returns false if nothing is bound to it.
    pub fn set_pressed(&mut self, key: &str, pressed: bool) -> bool {
        match self.entries.get_mut(key) {
            Some(binding) => {
                binding.pressed = pressed;
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The callback each entry wants to run this tick: `on_start` if pressed, `on_stop` if not.
    pub(crate) fn due_callbacks(&self) -> Vec<KeyCallback> {
        self.entries
            .values()
            .map(|b| {
                if b.pressed {
                    Rc::clone(&b.on_start)
                } else {
                    Rc::clone(&b.on_stop)
                }
            })
            .collect()
    }
}

/// The input subsystem: raw event queue, normalized state and the key-state table.
pub(crate) struct Input {
    state: InputState,
    bindings: KeyStateTable,
    receiver: Receiver<RawInput>,
    listener: InputListener,
    gamepad_deadzone: f32,
}

impl Input {
    pub(crate) fn new(gamepad_deadzone: f32) -> Self {
        let (listener, receiver) = InputListener::channel();
        Self {
            state: InputState::default(),
            bindings: KeyStateTable::default(),
            receiver,
            listener,
            gamepad_deadzone,
        }
    }

    pub(crate) fn listener(&self) -> InputListener {
        self.listener.clone()
    }

    pub(crate) fn state(&self) -> &InputState {
        &self.state
    }

    pub(crate) fn bindings(&self) -> &KeyStateTable {
        &self.bindings
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut KeyStateTable {
        &mut self.bindings
    }

    /// Apply every queued raw event. UI events are handed back for dispatch.
    pub(crate) fn drain(&mut self) -> Vec<(String, String)> {
        let mut ui_events = Vec::new();
        while let Ok(raw) = self.receiver.try_recv() {
            if let Some(ui) = self.apply(raw) {
                ui_events.push(ui);
            }
        }
        ui_events
    }

    /// Reset per-tick pseudo-keys once callbacks have observed them.
    pub(crate) fn end_tick(&mut self) {
        self.bindings.set_pressed(MOUSE_POSITION_KEY, false);
    }

    pub(crate) fn apply(&mut self, raw: RawInput) -> Option<(String, String)> {
        match raw {
            RawInput::KeyDown(key) => {
                self.bindings.set_pressed(&key, true);
                self.state.keyboard.insert(key, true);
            }
            RawInput::KeyUp(key) => {
                self.bindings.set_pressed(&key, false);
                self.state.keyboard.insert(key, false);
            }
            RawInput::MouseDown { button, position } => {
                self.state.mouse = Some(MouseSnapshot {
                    position,
                    kind: MouseEventKind::Down(button),
                });
                self.bindings.set_pressed(&mouse_button_key(button), true);
            }
            RawInput::MouseUp { button, position } => {
                self.state.mouse = Some(MouseSnapshot {
                    position,
                    kind: MouseEventKind::Up(button),
                });
                self.bindings.set_pressed(&mouse_button_key(button), false);
            }
            RawInput::MouseMove { position } => {
                self.state.mouse = Some(MouseSnapshot {
                    position,
                    kind: MouseEventKind::Move,
                });
                self.bindings.set_pressed(MOUSE_POSITION_KEY, true);
            }
            RawInput::TouchStart { .. } | RawInput::TouchMove { .. } | RawInput::TouchEnd { .. } => {
                log::trace!("touch input ignored");
            }
            RawInput::GamepadConnected(snapshot) => {
                self.mirror_gamepad(&snapshot);
                self.state.store_gamepad(snapshot);
            }
            RawInput::GamepadPolled(snapshot) => {
                // A poll racing a disconnect must not resurrect the device.
                if self.state.gamepad(snapshot.index).is_some() {
                    self.mirror_gamepad(&snapshot);
                    self.state.store_gamepad(snapshot);
                }
            }
            RawInput::GamepadDisconnected { index } => {
                // Key-state flags of the device are left as they were.
                if let Some(slot) = self.state.gamepads.get_mut(index) {
                    *slot = None;
                }
            }
            RawInput::Ui { tag, event } => return Some((tag, event)),
        }
        None
    }

    fn mirror_gamepad(&mut self, snapshot: &GamepadSnapshot) {
        if self.bindings.is_empty() {
            return;
        }
        for (n, button) in snapshot.buttons.iter().enumerate() {
            self.bindings
                .set_pressed(&gamepad_button_key(snapshot.index, n), button.pressed);
        }
        let active = snapshot.axis_active(self.gamepad_deadzone);
        self.bindings
            .set_pressed(&gamepad_axis_key(snapshot.index), active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamepad::ButtonSnapshot;

    fn noop() -> KeyCallback {
        Rc::new(|_: &mut EngineContext| {})
    }

    fn input_with(keys: &[&str]) -> Input {
        let mut input = Input::new(0.1);
        for key in keys {
            input.bindings_mut().insert(*key, noop(), noop());
        }
        input
    }

    #[test]
    fn key_ids_follow_the_naming_convention() {
        assert_eq!(mouse_button_key(2), "mouse2");
        assert_eq!(gamepad_button_key(0, 7), "gamepad0_button7");
        assert_eq!(gamepad_axis_key(3), "gamepad3_axis");
    }

    #[test]
    fn keyboard_updates_state_and_binding() {
        let mut input = input_with(&["ArrowLeft"]);
        let listener = input.listener();
        listener.key_down("ArrowLeft");
        listener.key_down("x");
        input.drain();
        assert!(input.state().is_key_down("ArrowLeft"));
        assert!(input.state().is_key_down("x"));
        assert!(input.bindings().is_pressed("ArrowLeft"));
        assert!(!input.bindings().contains("x"));

        listener.key_up("ArrowLeft");
        input.drain();
        assert!(!input.state().is_key_down("ArrowLeft"));
        assert!(!input.bindings().is_pressed("ArrowLeft"));
    }

    #[test]
    fn mouse_buttons_and_movement() {
        let mut input = input_with(&["mouse0", MOUSE_POSITION_KEY]);
        let listener = input.listener();
        listener.mouse_down(0, Vec2::new(5.0, 6.0));
        listener.mouse_move(Vec2::new(7.0, 8.0));
        input.drain();
        assert!(input.bindings().is_pressed("mouse0"));
        assert!(input.bindings().is_pressed(MOUSE_POSITION_KEY));
        assert_eq!(input.state().mouse_position(), Vec2::new(7.0, 8.0));
        assert_eq!(input.state().mouse().unwrap().kind, MouseEventKind::Move);

        input.end_tick();
        assert!(!input.bindings().is_pressed(MOUSE_POSITION_KEY));
        assert!(input.bindings().is_pressed("mouse0"));
    }

    #[test]
    fn gamepad_mirrors_only_registered_keys() {
        let mut input = input_with(&["gamepad0_button1", "gamepad0_axis"]);
        let pad = GamepadSnapshot::new(0, "pad")
            .with_axes(vec![0.0, 0.9])
            .with_buttons(vec![
                ButtonSnapshot { pressed: true, value: 1.0 },
                ButtonSnapshot { pressed: true, value: 1.0 },
            ]);
        input.apply(RawInput::GamepadConnected(pad));
        assert!(input.bindings().is_pressed("gamepad0_button1"));
        assert!(input.bindings().is_pressed("gamepad0_axis"));
        assert!(!input.bindings().contains("gamepad0_button0"));
        assert_eq!(input.state().gamepads().count(), 1);
    }

    #[test]
    fn gamepad_disconnect_keeps_stale_flags() {
        let mut input = input_with(&["gamepad0_button0"]);
        let pad = GamepadSnapshot::new(0, "pad").with_buttons(vec![ButtonSnapshot {
            pressed: true,
            value: 1.0,
        }]);
        input.apply(RawInput::GamepadConnected(pad.clone()));
        input.apply(RawInput::GamepadDisconnected { index: 0 });
        assert!(input.state().gamepad(0).is_none());
        assert!(input.bindings().is_pressed("gamepad0_button0"));

        // Late polls after the disconnect are dropped.
        input.apply(RawInput::GamepadPolled(pad));
        assert!(input.state().gamepad(0).is_none());
    }

    #[test]
    fn ui_events_are_returned_and_touch_is_inert() {
        let mut input = input_with(&[]);
        let listener = input.listener();
        listener.send(RawInput::TouchStart {
            id: 1,
            position: Vec2::ZERO,
        });
        listener.ui_event("menu", "click");
        let ui = input.drain();
        assert_eq!(ui, vec![("menu".to_string(), "click".to_string())]);
    }

    #[test]
    fn table_removal_of_unknown_key_is_a_no_op() {
        let mut table = KeyStateTable::default();
        assert!(!table.remove("nothing"));
        table.insert("a", noop(), noop());
        assert!(!table.set_pressed("b", true));
        assert!(table.remove("a"));
        assert!(table.is_empty());
    }
}
