//! Reading source image sizes via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Only the header is
//! decoded; pixel data is never loaded.

use crate::letterbox::ImageDims;
use crate::util::{YoloDecodeError, YoloDecodeResult};
use std::path::Path;

/// Returns `(width, height)` of the image stored at `path`.
pub fn image_dims<P: AsRef<Path>>(path: P) -> YoloDecodeResult<ImageDims> {
    let (width, height) =
        image::image_dimensions(path).map_err(|err| YoloDecodeError::ImageIo {
            reason: err.to_string(),
        })?;
    Ok(ImageDims::new(width as f32, height as f32))
}

/// Reads the dims of several images, preserving order.
pub fn image_dims_list<P: AsRef<Path>>(paths: &[P]) -> YoloDecodeResult<Vec<ImageDims>> {
    paths.iter().map(image_dims).collect()
}
