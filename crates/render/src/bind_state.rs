//! Cache of the texture, framebuffer and program currently bound.
//!
//! # Invariants
//! - A bind changes the cache, and is reported as needing a backend call,
//!   only when the handle differs from the cached one.
//! - `None` for the framebuffer is the default target, cached like any id.

use crate::handles::{FramebufferId, ProgramId, TextureId};

/// Issued versus skipped binds for one resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindCount {
    pub issued: u64,
    pub elided: u64,
}

impl BindCount {
    fn record(&mut self, changed: bool) {
        if changed {
            self.issued += 1;
        } else {
            self.elided += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindStats {
    pub textures: BindCount,
    pub framebuffers: BindCount,
    pub programs: BindCount,
}

impl BindStats {
    pub fn issued(&self) -> u64 {
        self.textures.issued + self.framebuffers.issued + self.programs.issued
    }

    pub fn elided(&self) -> u64 {
        self.textures.elided + self.framebuffers.elided + self.programs.elided
    }
}

/// What the renderer last bound on the backend.
///
/// Each `bind_*` compares against the cached value and returns whether the
/// backend call must actually be issued, updating the cache when it must.
/// The framebuffer starts on the default target (`None`); textures and
/// programs start unbound.
#[derive(Debug, Clone, Default)]
pub struct BindState {
    texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
    program: Option<ProgramId>,
    stats: BindStats,
}

impl BindState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_texture(&mut self, texture: TextureId) -> bool {
        let changed = self.texture != Some(texture);
        if changed {
            self.texture = Some(texture);
        }
        self.stats.textures.record(changed);
        changed
    }

    pub fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) -> bool {
        let changed = self.framebuffer != framebuffer;
        if changed {
            self.framebuffer = framebuffer;
        }
        self.stats.framebuffers.record(changed);
        changed
    }

    pub fn bind_program(&mut self, program: ProgramId) -> bool {
        let changed = self.program != Some(program);
        if changed {
            self.program = Some(program);
        }
        self.stats.programs.record(changed);
        changed
    }

    /// Drop a deleted object from the cache so a recycled id rebinds.
    pub fn forget_texture(&mut self, texture: TextureId) {
        if self.texture == Some(texture) {
            self.texture = None;
        }
    }

    pub fn forget_program(&mut self, program: ProgramId) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn stats(&self) -> BindStats {
        self.stats
    }
}
