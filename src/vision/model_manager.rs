// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR model manager: lazy, single-flight loading per model type

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use image::DynamicImage;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::models::downloading::DownloadConfig;
use crate::models::{DownloadError, ModelDownloader, ModelType};
use crate::vision::invoker::OcrError;
use crate::vision::ocr::{PaddleOcrModel, RecognizedFragment};

/// A loaded OCR engine that can read one page
///
/// Blocking: implementations run inference synchronously.
pub trait PageRecognizer: Send + Sync {
    /// Recognize text fragments on a page, in reading order
    fn recognize(&self, page: &DynamicImage) -> anyhow::Result<Vec<RecognizedFragment>>;
}

/// Produces a ready-to-use engine for a model type
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_type: ModelType) -> anyhow::Result<Arc<dyn PageRecognizer>>;
}

/// Loads PP-OCRv5 ONNX models, downloading missing artifacts first
pub struct OnnxModelLoader {
    downloader: ModelDownloader,
}

impl OnnxModelLoader {
    pub fn new(downloader: ModelDownloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self, model_type: ModelType) -> anyhow::Result<Arc<dyn PageRecognizer>> {
        let paths = self.downloader.ensure_model(&model_type.spec()).await?;

        let model = tokio::task::spawn_blocking(move || PaddleOcrModel::load(&paths)).await??;
        Ok(Arc::new(model))
    }
}

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn PageRecognizer>, OcrError>>>;

/// State of one model type in the registry
enum Slot {
    Empty,
    Loading(LoadFuture),
    Ready(Arc<dyn PageRecognizer>),
}

type SlotCell = Arc<Mutex<Slot>>;

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide cache of loaded OCR engines
///
/// Each model type is loaded by a single spawned task. Every request that
/// arrives while it runs awaits the same outcome, so a failing load is
/// attempted once and its error reaches all of them. The task settles the
/// slot itself: success is cached, failure empties the slot so the next
/// request starts a fresh load. Dropping a waiting request never cancels
/// the load.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    mobile: SlotCell,
    server: SlotCell,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            mobile: Arc::new(Mutex::new(Slot::Empty)),
            server: Arc::new(Mutex::new(Slot::Empty)),
        }
    }

    /// Registry backed by ONNX models cached under the configured directory
    pub fn from_config(config: &ServiceConfig) -> Result<Self, DownloadError> {
        let downloader = ModelDownloader::new(DownloadConfig {
            download_dir: config.model_cache_dir.clone(),
            base_url: config.model_base_url.clone(),
            ..DownloadConfig::default()
        })?;

        Ok(Self::new(Arc::new(OnnxModelLoader::new(downloader))))
    }

    fn slot(&self, model_type: ModelType) -> &SlotCell {
        match model_type {
            ModelType::Mobile => &self.mobile,
            ModelType::Server => &self.server,
        }
    }

    /// Get the engine for `model_type`, loading it on first use
    pub async fn get(&self, model_type: ModelType) -> Result<Arc<dyn PageRecognizer>, OcrError> {
        let pending = {
            let mut slot = lock_slot(self.slot(model_type));
            match &*slot {
                Slot::Ready(engine) => return Ok(Arc::clone(engine)),
                Slot::Loading(pending) => pending.clone(),
                Slot::Empty => {
                    let pending = self.spawn_load(model_type);
                    *slot = Slot::Loading(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Start the load task for `model_type`; the caller marks the slot loading
    fn spawn_load(&self, model_type: ModelType) -> LoadFuture {
        let loader = Arc::clone(&self.loader);
        let slot = Arc::clone(self.slot(model_type));

        let task = tokio::spawn(async move {
            info!("🔄 Loading {} OCR model...", model_type);
            let outcome = AssertUnwindSafe(loader.load(model_type))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("model loader panicked")));

            match outcome {
                Ok(engine) => {
                    info!("✅ {} OCR model loaded", model_type);
                    *lock_slot(&slot) = Slot::Ready(Arc::clone(&engine));
                    Ok(engine)
                }
                Err(e) => {
                    error!("❌ Failed to load {} OCR model: {:#}", model_type, e);
                    *lock_slot(&slot) = Slot::Empty;
                    Err(OcrError::ModelLoad {
                        model_type,
                        message: format!("{:#}", e),
                    })
                }
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(OcrError::ModelLoad {
                    model_type,
                    message: format!("load task failed: {}", e),
                })
            })
        }
        .boxed()
        .shared()
    }

    pub fn is_loaded(&self, model_type: ModelType) -> bool {
        matches!(*lock_slot(self.slot(model_type)), Slot::Ready(_))
    }

    /// Model types currently held in memory
    pub fn loaded_models(&self) -> Vec<ModelType> {
        ModelType::ALL
            .iter()
            .copied()
            .filter(|t| self.is_loaded(*t))
            .collect()
    }
}
