// SPDX-License-Identifier: MPL-2.0
//! Image processing stages shared by inference and dataset preparation.
//!
//! Inference runs [`normalize`] → [`degrade`] → model → [`denormalize`].
//! Dataset preparation runs [`normalize`] → [`augment`] → [`degrade`] →
//! [`tiling`].

pub mod augment;
pub mod degrade;
pub mod denormalize;
pub mod normalize;
pub mod tiling;

pub use augment::{augment, augmentations_for, Augmentation};
pub use degrade::{degrade, degrade_canonical};
pub use denormalize::{denormalize, to_input_tensor};
pub use normalize::{canonicalize, canonicalize_gray};
pub use tiling::{patch_origins, tile, tile_pairs};

/// Supported input extensions
pub mod extensions {
    use std::path::Path;

    /// Extensions accepted for upload and dataset scanning.
    pub const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "dcm"];

    /// Checks if a file extension is accepted, ignoring case.
    #[must_use]
    pub fn is_supported(ext: &str) -> bool {
        INPUT_EXTENSIONS
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(ext))
    }

    /// Checks if a file path has an accepted extension.
    #[must_use]
    pub fn path_is_supported<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_supported)
    }
}
