// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect_car;
pub mod errors;
pub mod http_server;

pub use detect_car::{
    detect_car_handler, detect_car_simple_handler, DetectCarResponse, DetectCarSimpleResponse,
    ModelSummary,
};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{router, start_server, AppState, HealthResponse};
