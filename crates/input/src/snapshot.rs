use glam::IVec2;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

impl MouseButton {
    pub const COUNT: usize = 5;

    pub const ALL: [MouseButton; Self::COUNT] = [
        MouseButton::Left,
        MouseButton::Middle,
        MouseButton::Right,
        MouseButton::Back,
        MouseButton::Forward,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Input state as of one `process()` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Cursor in logical canvas pixels.
    pub cursor: IVec2,
    /// Cursor movement since the previous snapshot.
    pub delta_cursor: IVec2,
    pub buttons: [bool; MouseButton::COUNT],
    pub buttons_clicked: [bool; MouseButton::COUNT],
    /// Keys currently held, by host key name.
    pub keys: BTreeSet<String>,
    pub keys_pressed: BTreeSet<String>,
}

impl InputSnapshot {
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }

    pub fn button_clicked(&self, button: MouseButton) -> bool {
        self.buttons_clicked[button.index()]
    }

    pub fn key_down(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn key_pressed(&self, key: &str) -> bool {
        self.keys_pressed.contains(key)
    }

    /// -1, 0 or 1 from a pair of opposing keys.
    pub fn axis(&self, negative: &str, positive: &str) -> i32 {
        i32::from(self.key_down(positive)) - i32::from(self.key_down(negative))
    }
}
