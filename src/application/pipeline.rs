// SPDX-License-Identifier: MPL-2.0
//! Single-image enhancement: canonicalize, degrade, run the modality's model,
//! denormalize.

use crate::application::port::ai::SuperResolver;
use crate::application::registry::ModelRegistry;
use crate::domain::image::CanonicalImage;
use crate::domain::modality::Modality;
use crate::error::Result;
use crate::media::{canonicalize, degrade_canonical, denormalize, to_input_tensor};
use image_rs::GrayImage;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Runs the canonical image through `model` after simulating resolution loss.
///
/// # Errors
///
/// Returns [`crate::error::Error::Model`] if inference fails or produces a
/// malformed tensor.
pub fn enhance_canonical(model: &dyn SuperResolver, image: &CanonicalImage) -> Result<GrayImage> {
    let degraded = degrade_canonical(image);
    let input = to_input_tensor(degraded.as_gray());
    let output = model.enhance(input.view())?;
    denormalize(output.view())
}

/// Enhancement pipeline backed by a shared [`ModelRegistry`].
#[derive(Debug, Clone)]
pub struct EnhancementPipeline {
    registry: Arc<ModelRegistry>,
}

impl EnhancementPipeline {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Enhances the image at `path` with the model for `modality`.
    ///
    /// The image is decoded before the model is resolved, so an unreadable
    /// input never triggers a checkpoint load.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::InvalidImage`] for undecodable input,
    /// [`crate::error::Error::CheckpointNotFound`] if the modality has no
    /// weights, and [`crate::error::Error::Model`] if inference fails.
    pub fn enhance_file(&self, path: &Path, modality: Modality) -> Result<GrayImage> {
        let canonical = canonicalize(path)?;
        debug!(path = %path.display(), modality = %modality, "canonicalized input");
        self.enhance(&canonical, modality)
    }

    /// Enhances an already canonical image.
    ///
    /// # Errors
    ///
    /// See [`EnhancementPipeline::enhance_file`].
    pub fn enhance(&self, image: &CanonicalImage, modality: Modality) -> Result<GrayImage> {
        let model = self.registry.get_or_load(modality)?;
        let enhanced = enhance_canonical(model.as_ref(), image)?;
        debug!(modality = %modality, "enhanced image");
        Ok(enhanced)
    }
}
