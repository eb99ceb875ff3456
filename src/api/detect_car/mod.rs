// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Car detection API endpoint module
//!
//! Provides POST /detect-car (full results) and POST /detect-car-simple
//! (boolean only) over a multipart image upload.

pub mod handler;
pub mod response;

pub use handler::{detect_car_handler, detect_car_simple_handler};
pub use response::{DetectCarResponse, DetectCarSimpleResponse, ModelSummary};
