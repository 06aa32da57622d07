use glam::{IVec2, Vec2};
use std::collections::BTreeSet;

use crate::snapshot::{InputSnapshot, MouseButton};

/// Accumulates host events between snapshots.
///
/// The canvas is `width x height` logical pixels shown at `scale` physical
/// pixels each. Relative mouse motion is accumulated in physical pixels and
/// clamped to the canvas before being divided back down.
#[derive(Debug, Clone)]
pub struct InputCollector {
    width: u32,
    height: u32,
    scale: u32,
    focused: bool,
    raw_cursor: Vec2,
    buttons: [bool; MouseButton::COUNT],
    keys: BTreeSet<String>,
    last: InputSnapshot,
}

impl InputCollector {
    pub fn new(width: u32, height: u32, scale: u32) -> Self {
        Self {
            width,
            height,
            scale: scale.max(1),
            focused: false,
            raw_cursor: Vec2::ZERO,
            buttons: [false; MouseButton::COUNT],
            keys: BTreeSet::new(),
            last: InputSnapshot::default(),
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Pointer lock or window focus changed. Losing focus releases
    /// everything held so nothing sticks down.
    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            tracing::debug!(focused, "input focus changed");
        }
        self.focused = focused;
        if !focused {
            self.buttons = [false; MouseButton::COUNT];
            self.keys.clear();
        }
    }

    /// Returns true when the press should instead be used to acquire focus.
    pub fn mouse_down(&mut self, button: MouseButton) -> bool {
        if !self.focused {
            return true;
        }
        self.buttons[button.index()] = true;
        false
    }

    pub fn mouse_up(&mut self, button: MouseButton) {
        if self.focused {
            self.buttons[button.index()] = false;
        }
    }

    /// Relative motion in physical pixels.
    pub fn mouse_moved(&mut self, dx: f32, dy: f32) {
        if !self.focused {
            return;
        }
        let max = Vec2::new(
            self.width.saturating_mul(self.scale) as f32 - 1.0,
            self.height.saturating_mul(self.scale) as f32 - 1.0,
        )
        .max(Vec2::ZERO);
        self.raw_cursor = (self.raw_cursor + Vec2::new(dx, dy)).clamp(Vec2::ZERO, max);
    }

    pub fn key_down(&mut self, key: &str) {
        if self.focused {
            self.keys.insert(key.to_owned());
        }
    }

    pub fn key_up(&mut self, key: &str) {
        if self.focused {
            self.keys.remove(key);
        }
    }

    /// Cursor in logical pixels.
    pub fn cursor(&self) -> IVec2 {
        (self.raw_cursor / self.scale as f32).floor().as_ivec2()
    }

    /// Take the next snapshot, computing edges against the previous one.
    pub fn process(&mut self) -> InputSnapshot {
        let cursor = self.cursor();
        let previous = &self.last;

        let mut buttons_clicked = [false; MouseButton::COUNT];
        for (i, clicked) in buttons_clicked.iter_mut().enumerate() {
            *clicked = self.buttons[i] && !previous.buttons[i];
        }

        let keys_pressed = self.keys.difference(&previous.keys).cloned().collect();

        let snapshot = InputSnapshot {
            cursor,
            delta_cursor: cursor - previous.cursor,
            buttons: self.buttons,
            buttons_clicked,
            keys: self.keys.clone(),
            keys_pressed,
        };
        self.last = snapshot.clone();
        snapshot
    }

    pub fn last(&self) -> &InputSnapshot {
        &self.last
    }
}
