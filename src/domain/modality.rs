// SPDX-License-Identifier: MPL-2.0
//! Imaging modality and filename-based detection.
//!
//! Detection is a plain substring match on the lowercased name, tested in a
//! fixed priority order:
//!
//! 1. X-ray tokens: `xray`, `x_ray`, `x-ray`
//! 2. CT token: `ct`
//! 3. MRI token: `mri`
//!
//! The first matching group wins. A name carrying both `ct` and `mri`
//! therefore resolves to CT, and a name matching nothing falls back to X-ray.
//! Both behaviors are inherited from how the models were deployed; callers
//! that know the modality should pass it explicitly instead of relying on the
//! filename.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const XRAY_TOKENS: [&str; 3] = ["xray", "x_ray", "x-ray"];
const CT_TOKEN: &str = "ct";
const MRI_TOKEN: &str = "mri";

/// Imaging domain selecting the trained model and the augmentation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Xray,
    Ct,
    Mri,
}

impl Modality {
    /// All modalities, in detection priority order.
    pub const ALL: [Modality; 3] = [Modality::Xray, Modality::Ct, Modality::Mri];

    /// Lowercase name used in checkpoint and dataset paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Modality::Xray => "xray",
            Modality::Ct => "ct",
            Modality::Mri => "mri",
        }
    }

    /// Uppercase name used in user-facing labels.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Modality::Xray => "XRAY",
            Modality::Ct => "CT",
            Modality::Mri => "MRI",
        }
    }

    /// Name of the raw image folder under the dataset root.
    #[must_use]
    pub const fn dataset_folder(self) -> &'static str {
        match self {
            Modality::Xray => "Xray",
            Modality::Ct => "CT",
            Modality::Mri => "MRI",
        }
    }

    /// Returns the modality whose tokens appear in `name`, or `None` when no
    /// token matches.
    #[must_use]
    pub fn from_path_tokens(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if XRAY_TOKENS.iter().any(|token| lower.contains(token)) {
            Some(Modality::Xray)
        } else if lower.contains(CT_TOKEN) {
            Some(Modality::Ct)
        } else if lower.contains(MRI_TOKEN) {
            Some(Modality::Mri)
        } else {
            None
        }
    }
}

/// Maps a filename or path to a modality. Never fails; defaults to X-ray.
#[must_use]
pub fn detect_modality(name: &str) -> Modality {
    Modality::from_path_tokens(name).unwrap_or(Modality::Xray)
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an explicit modality tag fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown modality '{0}' (expected xray, ct or mri)")]
pub struct ParseModalityError(pub String);

impl FromStr for Modality {
    type Err = ParseModalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xray" | "x_ray" | "x-ray" => Ok(Modality::Xray),
            "ct" => Ok(Modality::Ct),
            "mri" => Ok(Modality::Mri),
            _ => Err(ParseModalityError(s.to_string())),
        }
    }
}
