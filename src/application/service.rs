// SPDX-License-Identifier: MPL-2.0
//! Upload and inference boundaries.
//!
//! [`EnhanceService`] is the surface a transport (HTTP handler, message
//! consumer, CLI) calls: it stores uploaded bytes under a sanitized name and
//! later enhances them by reference. Errors carry an
//! [`ErrorKind`](crate::error::ErrorKind) so callers can map them onto their
//! own status codes.

use crate::application::pipeline::EnhancementPipeline;
use crate::application::registry::{CheckpointLoader, ModelRegistry};
use crate::config::Config;
use crate::domain::modality::{detect_modality, Modality};
use crate::error::{Error, Result};
use crate::media::extensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Confidence reported with every prediction.
///
/// The models do not produce a score; this is a fixed placeholder kept for
/// response compatibility.
pub const PREDICTION_CONFIDENCE: f32 = 0.99;

/// Prefix of every enhanced output file.
pub const ENHANCED_PREFIX: &str = "enhanced_";

/// Name of a stored file, relative to the service's upload or result
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        Path::new(&self.0)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.0)
    }

    /// The stored name this reference resolves to, sanitized the same way
    /// as an upload.
    fn sanitized(&self) -> Self {
        Self(sanitize_filename(&self.0))
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Result of a successful enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub modality: Modality,
    /// `"<MODALITY> image enhanced"`.
    pub prediction: String,
    pub confidence: f32,
    /// Enhanced output, relative to the results directory.
    pub enhanced: FileRef,
}

/// Reduces an untrusted file name to a safe single path component.
///
/// Directory components are dropped, whitespace becomes `_`, characters
/// outside `[A-Za-z0-9._-]` are removed and leading dots are stripped. The
/// result may be empty.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Stores uploads and enhances them.
#[derive(Debug, Clone)]
pub struct EnhanceService {
    pipeline: EnhancementPipeline,
    uploads_dir: PathBuf,
    results_dir: PathBuf,
}

impl EnhanceService {
    pub fn new(
        pipeline: EnhancementPipeline,
        uploads_dir: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            uploads_dir: uploads_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Builds a service with a checkpoint-backed registry from `config`.
    ///
    /// Directories in `config` are used as given; resolve them first with
    /// [`Config::resolved_against`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let loader = CheckpointLoader::new(&config.storage.checkpoints_dir, config.model.backend)
            .with_intra_threads(config.model.intra_threads());
        let registry = Arc::new(ModelRegistry::new(loader));
        Self::new(
            EnhancementPipeline::new(registry),
            &config.storage.uploads_dir,
            &config.storage.results_dir,
        )
    }

    #[must_use]
    pub fn pipeline(&self) -> &EnhancementPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Location of an uploaded file.
    #[must_use]
    pub fn upload_path(&self, file: &FileRef) -> PathBuf {
        self.uploads_dir.join(file.as_str())
    }

    /// Location of an enhanced output.
    #[must_use]
    pub fn result_path(&self, file: &FileRef) -> PathBuf {
        self.results_dir.join(file.as_str())
    }

    /// Stores uploaded bytes and returns their reference.
    ///
    /// A later upload with the same sanitized name replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFileType`] if the sanitized name is empty
    /// or its extension is not one of `jpg`, `jpeg`, `png`, `dcm`, and
    /// [`Error::Io`] if the file cannot be written.
    pub fn store_upload(&self, name: &str, bytes: &[u8]) -> Result<FileRef> {
        let sanitized = sanitize_filename(name);
        if sanitized.is_empty() || !extensions::path_is_supported(&sanitized) {
            return Err(Error::UnsupportedFileType(name.to_string()));
        }

        fs::create_dir_all(&self.uploads_dir)?;
        let file = FileRef::new(sanitized);
        fs::write(self.upload_path(&file), bytes)?;
        info!(file = %file, bytes = bytes.len(), "stored upload");
        Ok(file)
    }

    /// Enhances a previously stored upload.
    ///
    /// The reference is sanitized like an upload name, so `knee mri.png`
    /// finds the file stored as `knee_mri.png`. The modality is detected from
    /// the file name. The image is decoded before the model is looked up, and
    /// the output is written only once every stage has succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFileReference`] if `file` was never stored,
    /// [`Error::InvalidImage`] if it cannot be decoded (even when the
    /// modality also has no weights), [`Error::CheckpointNotFound`] if the
    /// detected modality has no weights, and [`Error::Model`] or
    /// [`Error::Io`] for internal failures.
    pub fn predict(&self, file: &FileRef) -> Result<Prediction> {
        self.predict_as(file, detect_modality(file.as_str()))
    }

    /// Enhances a stored upload with an explicit modality, bypassing
    /// detection.
    ///
    /// # Errors
    ///
    /// See [`EnhanceService::predict`].
    pub fn predict_as(&self, file: &FileRef, modality: Modality) -> Result<Prediction> {
        let stored = file.sanitized();
        let path = self.upload_path(&stored);
        if stored.as_str().is_empty() || !path.is_file() {
            return Err(Error::UnknownFileReference(file.to_string()));
        }

        let enhanced = self.pipeline.enhance_file(&path, modality)?;

        fs::create_dir_all(&self.results_dir)?;
        let output = FileRef::new(format!("{ENHANCED_PREFIX}{}.png", stored.stem()));
        enhanced.save(self.result_path(&output))?;
        info!(file = %stored, modality = %modality, output = %output, "enhancement complete");

        Ok(Prediction {
            modality,
            prediction: format!("{} image enhanced", modality.label()),
            confidence: PREDICTION_CONFIDENCE,
            enhanced: output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::ai::{ModelCapabilities, ModelResult, SuperResolver};
    use crate::application::registry::ModelLoader;
    use crate::error::ErrorKind;
    use image_rs::{GrayImage, Luma};
    use ndarray::{Array4, ArrayView4};
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    #[derive(Debug)]
    struct Identity;

    impl SuperResolver for Identity {
        fn enhance(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>> {
            Ok(input.to_owned())
        }

        fn capabilities(&self) -> ModelCapabilities {
            ModelCapabilities::new("identity", "test")
        }
    }

    struct IdentityLoader;

    impl ModelLoader for IdentityLoader {
        fn load(&self, _modality: Modality) -> Result<Arc<dyn SuperResolver>> {
            Ok(Arc::new(Identity))
        }
    }

    fn service() -> (TempDir, EnhanceService) {
        let dir = tempdir().expect("failed to create temp dir");
        let pipeline = EnhancementPipeline::new(Arc::new(ModelRegistry::new(IdentityLoader)));
        let service = EnhanceService::new(
            pipeline,
            dir.path().join("uploads"),
            dir.path().join("results"),
        );
        (dir, service)
    }

    fn png_bytes(value: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        GrayImage::from_pixel(40, 30, Luma([value]))
            .write_to(&mut Cursor::new(&mut bytes), image_rs::ImageFormat::Png)
            .expect("failed to encode png");
        bytes
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\scans\\knee mri.png"), "knee_mri.png");
        assert_eq!(sanitize_filename("...hidden.jpg"), "hidden.jpg");
        assert_eq!(sanitize_filename("sc@n#1.dcm"), "scn1.dcm");
        assert_eq!(sanitize_filename("../"), "");
    }

    #[test]
    fn upload_rejects_disallowed_extensions() {
        let (_dir, service) = service();
        for name in ["notes.txt", "scan.gif", "noext", "", "..."] {
            let err = service.store_upload(name, b"data").unwrap_err();
            assert!(matches!(err, Error::UnsupportedFileType(_)), "{name}");
            assert_eq!(err.kind(), ErrorKind::Invalid);
        }
    }

    #[test]
    fn upload_accepts_mixed_case_extensions() {
        let (_dir, service) = service();
        let file = service.store_upload("Chest XRAY.PNG", &png_bytes(3)).unwrap();
        assert_eq!(file.as_str(), "Chest_XRAY.PNG");
        assert!(service.upload_path(&file).is_file());
    }

    #[test]
    fn predict_writes_enhanced_png() {
        let (_dir, service) = service();
        let file = service.store_upload("brain_mri_7.png", &png_bytes(128)).unwrap();

        let prediction = service.predict(&file).unwrap();
        assert_eq!(prediction.modality, Modality::Mri);
        assert_eq!(prediction.prediction, "MRI image enhanced");
        assert_eq!(prediction.enhanced.as_str(), "enhanced_brain_mri_7.png");

        let output = image_rs::open(service.result_path(&prediction.enhanced))
            .expect("enhanced output should decode")
            .to_luma8();
        assert_eq!(output.dimensions(), (256, 256));
        assert!(output.pixels().all(|p| p.0[0] == 128));
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let (_dir, service) = service();
        let err = service.predict(&FileRef::from("never_uploaded.png")).unwrap_err();
        assert!(matches!(err, Error::UnknownFileReference(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn traversal_reference_is_not_found() {
        let (dir, service) = service();
        fs::write(dir.path().join("secret.png"), png_bytes(1)).expect("failed to write");
        let err = service.predict(&FileRef::from("../secret.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn corrupt_upload_is_invalid_and_writes_nothing() {
        let (_dir, service) = service();
        let file = service.store_upload("ct_head.png", b"not a png").unwrap();

        let err = service.predict(&file).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(!service.result_path(&FileRef::from("enhanced_ct_head.png")).exists());
    }

    #[test]
    fn reference_is_sanitized_like_the_upload() {
        let (_dir, service) = service();
        let stored = service.store_upload("knee mri.png", &png_bytes(40)).unwrap();
        assert_eq!(stored.as_str(), "knee_mri.png");

        let prediction = service.predict(&FileRef::from("knee mri.png")).unwrap();
        assert_eq!(prediction.modality, Modality::Mri);
        assert_eq!(prediction.enhanced.as_str(), "enhanced_knee_mri.png");

        let err = service.predict(&FileRef::from("../")).unwrap_err();
        assert!(matches!(err, Error::UnknownFileReference(_)));
    }

    #[test]
    fn corrupt_upload_wins_over_missing_checkpoint() {
        let dir = tempdir().expect("failed to create temp dir");
        let service = EnhanceService::from_config(&Config::default().resolved_against(dir.path()));
        let file = service.store_upload("ct_head.png", b"not a png").unwrap();

        let err = service.predict(&file).unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
        assert!(service.pipeline().registry().loaded().is_empty());
    }

    #[test]
    fn explicit_modality_bypasses_detection() {
        let (_dir, service) = service();
        let file = service.store_upload("scan.png", &png_bytes(9)).unwrap();
        let prediction = service.predict_as(&file, Modality::Ct).unwrap();
        assert_eq!(prediction.prediction, "CT image enhanced");
    }

    #[test]
    fn file_ref_stem_drops_extension() {
        assert_eq!(FileRef::from("patient_xray_01.jpg").stem(), "patient_xray_01");
        assert_eq!(FileRef::from("plain").stem(), "plain");
    }
}
