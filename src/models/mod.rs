// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model selection and the PP-OCRv5 artifact catalog

pub mod downloading;

pub use downloading::{DownloadError, ModelDownloader, ModelPaths};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named model configuration trading speed against accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Smaller detector, faster on CPU
    Mobile,
    /// Larger detector, more accurate
    Server,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::Mobile, ModelType::Server];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Mobile => "mobile",
            ModelType::Server => "server",
        }
    }

    /// Artifacts that make up this model configuration
    pub fn spec(&self) -> ModelSpec {
        match self {
            ModelType::Mobile => ModelSpec {
                detection: DET_MOBILE,
                classification: Some(CLS_MOBILE),
                recognition: REC_LATIN,
                dictionary: DICT_LATIN,
            },
            ModelType::Server => ModelSpec {
                detection: DET_SERVER,
                classification: Some(CLS_MOBILE),
                recognition: REC_LATIN,
                dictionary: DICT_LATIN,
            },
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::Mobile
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mobile" => Ok(ModelType::Mobile),
            "server" => Ok(ModelType::Server),
            other => Err(format!(
                "Invalid model_type '{}'. Must be one of: mobile, server",
                other
            )),
        }
    }
}

/// One downloadable model file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelArtifact {
    /// File name inside the model cache directory
    pub file_name: &'static str,
    /// Path relative to the model base URL
    pub remote_path: &'static str,
}

/// Full set of artifacts for one `ModelType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub detection: ModelArtifact,
    pub classification: Option<ModelArtifact>,
    pub recognition: ModelArtifact,
    pub dictionary: ModelArtifact,
}

impl ModelSpec {
    pub fn artifacts(&self) -> Vec<ModelArtifact> {
        let mut artifacts = vec![self.detection];
        artifacts.extend(self.classification);
        artifacts.push(self.recognition);
        artifacts.push(self.dictionary);
        artifacts
    }
}

const DET_MOBILE: ModelArtifact = ModelArtifact {
    file_name: "ch_PP-OCRv5_mobile_det.onnx",
    remote_path: "onnx/PP-OCRv5/det/ch_PP-OCRv5_mobile_det.onnx",
};

const DET_SERVER: ModelArtifact = ModelArtifact {
    file_name: "ch_PP-OCRv5_server_det.onnx",
    remote_path: "onnx/PP-OCRv5/det/ch_PP-OCRv5_server_det.onnx",
};

const CLS_MOBILE: ModelArtifact = ModelArtifact {
    file_name: "ch_ppocr_mobile_v2.0_cls_infer.onnx",
    remote_path: "onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
};

// PP-OCRv5 ships the Latin recognizer in a single size
const REC_LATIN: ModelArtifact = ModelArtifact {
    file_name: "latin_PP-OCRv5_rec_mobile_infer.onnx",
    remote_path: "onnx/PP-OCRv5/rec/latin_PP-OCRv5_rec_mobile_infer.onnx",
};

const DICT_LATIN: ModelArtifact = ModelArtifact {
    file_name: "ppocrv5_latin_dict.txt",
    remote_path: "paddle/PP-OCRv5/rec/latin_PP-OCRv5_rec_mobile_infer/ppocrv5_latin_dict.txt",
};
