// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod vision;

pub use api::server::{create_app, AppState};
pub use config::ServiceConfig;
pub use models::ModelType;
pub use vision::model_manager::ModelRegistry;
