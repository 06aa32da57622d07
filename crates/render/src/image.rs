use std::fmt;
use std::sync::mpsc::{Receiver, TryRecvError};
use thiserror::Error;

use crate::handles::TextureId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("{width}x{height} RGBA image needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded RGBA8 pixels, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ImageError::SizeMismatch {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// Solid single-color image.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Something that eventually produces an image: a decode on another
/// thread, a network fetch, or data already in memory.
pub trait ImageSource {
    /// Returns the image once it is ready. After returning `Some`, later
    /// calls may return `None`.
    fn poll(&mut self) -> Option<ImageData>;
}

impl ImageSource for Option<ImageData> {
    fn poll(&mut self) -> Option<ImageData> {
        self.take()
    }
}

impl ImageSource for Receiver<ImageData> {
    fn poll(&mut self) -> Option<ImageData> {
        match self.try_recv() {
            Ok(image) => Some(image),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::trace!("image source disconnected");
                None
            }
        }
    }
}

/// A texture whose pixels may still be on their way.
///
/// Until [`crate::Renderer::refresh_texture`] has uploaded the image, the
/// texture reports zero size and is drawn with whatever the backend holds.
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
    source: Option<Box<dyn ImageSource + Send>>,
}

impl Texture {
    pub(crate) fn new(id: TextureId, source: Box<dyn ImageSource + Send>) -> Self {
        Self {
            id,
            width: 0,
            height: 0,
            source: Some(source),
        }
    }

    pub(crate) fn poll(&mut self) -> Option<ImageData> {
        let image = self.source.as_mut()?.poll()?;
        self.source = None;
        self.width = image.width();
        self.height = image.height();
        Some(image)
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn loaded(&self) -> bool {
        self.source.is_none()
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("loaded", &self.loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn image_size_is_validated() {
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
        assert_eq!(
            ImageData::new(2, 2, vec![0; 15]),
            Err(ImageError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn texture_loads_once_from_channel() {
        let (tx, rx) = mpsc::channel();
        let mut texture = Texture::new(TextureId(1), Box::new(rx));
        assert!(texture.poll().is_none());
        assert!(!texture.loaded());
        assert_eq!((texture.width(), texture.height()), (0, 0));

        tx.send(ImageData::filled(4, 2, [255, 0, 0, 255])).unwrap();
        let image = texture.poll().unwrap();
        assert_eq!(image.rgba().len(), 32);
        assert!(texture.loaded());
        assert_eq!((texture.width(), texture.height()), (4, 2));
        assert!(texture.poll().is_none());
    }

    #[test]
    fn disconnected_source_stays_unloaded() {
        let (tx, rx) = mpsc::channel::<ImageData>();
        drop(tx);
        let mut texture = Texture::new(TextureId(1), Box::new(rx));
        assert!(texture.poll().is_none());
        assert!(!texture.loaded());
    }
}
