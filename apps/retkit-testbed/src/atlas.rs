//! Sprite atlas loading off the event-loop thread.

use retkit_render::ImageData;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

/// Edge of one atlas cell in pixels; the scene addresses 4x4 cells.
const CELL: u32 = 16;
const CELLS: u32 = 4;

/// Decode `path` on a worker thread. The receiver yields the image once,
/// or a generated stand-in if the file cannot be read.
pub fn load_async(path: PathBuf) -> Receiver<ImageData> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let image = decode(&path).unwrap_or_else(|error| {
            tracing::warn!(
                path = %path.display(),
                %error,
                "atlas unavailable, using generated cells"
            );
            generated()
        });
        if tx.send(image).is_err() {
            tracing::debug!("atlas receiver dropped before decode finished");
        }
    });
    rx
}

fn decode(path: &Path) -> anyhow::Result<ImageData> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!(path = %path.display(), width, height, "atlas decoded");
    Ok(ImageData::new(width, height, rgba.into_raw())?)
}

/// One flat color per cell with a darker one-pixel border.
fn generated() -> ImageData {
    let size = CELL * CELLS;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let (cx, cy) = (x / CELL, y / CELL);
            let border =
                x % CELL == 0 || y % CELL == 0 || x % CELL == CELL - 1 || y % CELL == CELL - 1;
            let shade = if border { 2 } else { 1 };
            let r = (64 + cx * 48) as u8 / shade;
            let g = (64 + cy * 48) as u8 / shade;
            let b = (224 - (cx + cy) * 24) as u8 / shade;
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    match ImageData::new(size, size, rgba) {
        Ok(image) => image,
        Err(_) => ImageData::filled(size, size, [255; 4]),
    }
}
