use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton};

/// Polled input state of the stimulus window.
#[derive(Debug, Default)]
pub struct InputState {
    /// Pointer position, `None` while outside the window.
    pub pointer: Option<(f32, f32)>,
    pub buttons_down: HashSet<MouseButton>,
    pub keys_down: HashSet<Key>,
    /// Most recent key press, repeats included.
    pub last_key: Option<Key>,
    pub focused: bool,
    pressed: Vec<Key>,
}

impl InputState {
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMoved { x, y } => self.pointer = Some((x, y)),
            InputEvent::PointerLeft => self.pointer = None,
            InputEvent::Button { button, pressed } => {
                if pressed {
                    self.buttons_down.insert(button);
                } else {
                    self.buttons_down.remove(&button);
                }
            }
            InputEvent::Key {
                key,
                pressed,
                repeat,
            } => {
                if pressed {
                    self.last_key = Some(key);
                    if self.keys_down.insert(key) || repeat {
                        self.pressed.push(key);
                    }
                } else {
                    self.keys_down.remove(&key);
                }
            }
            InputEvent::Focused(focused) => {
                self.focused = focused;
                if !focused {
                    // No release events arrive while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }
        }
    }

    #[inline]
    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    #[inline]
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Key presses since the last call, oldest first.
    pub fn take_pressed(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.pressed)
    }
}
