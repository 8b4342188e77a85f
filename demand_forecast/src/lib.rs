//! # Demand Forecast
//!
//! Monthly service-volume and revenue forecasting for an operations
//! dashboard.
//!
//! ## Features
//!
//! - Validated monthly history (`YYYY-MM` periods, gap detection and filling)
//! - Holt-Winters seasonal forecasting with in-sample backtesting
//! - Run-rate / seasonal blending of the open period
//! - Sanity validation against trailing statistics
//! - Accuracy tracking of closed periods with alerting
//! - Async ports with timeout, retry and fallback around every upstream call
//!
//! ## Quick Start
//!
//! ```rust
//! use demand_forecast::config::ForecastParameters;
//! use demand_forecast::ensemble::EnsembleBlender;
//! use demand_forecast::models::SeasonalForecaster;
//! use demand_forecast::validator::{ForecastValidator, TrailingStats};
//!
//! let history = [100.0; 24];
//! let fit = SeasonalForecaster::new(ForecastParameters::default(), 12).fit_series(&history);
//!
//! // 40 units in the first 40% of the month
//! let blended = EnsembleBlender::default().blend_with_actual(40.0, fit.forecast, 0.4);
//!
//! let stats = TrailingStats {
//!     average_units: 100.0,
//!     average_value: 10_000.0,
//!     value_per_unit: Some(100.0),
//!     previous_units: Some(100.0),
//!     prior_growth: Some(0.0),
//! };
//! let outcome = ForecastValidator::default().validate(blended.value, 10_000.0, &stats);
//! assert!(outcome.is_valid);
//! ```

pub mod accuracy;
pub mod config;
pub mod data;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod period;
pub mod policy;
pub mod ports;
pub mod stores;
pub mod validator;

// Re-export commonly used types
pub use crate::accuracy::{AccuracyRecord, AccuracyTracker, AccuracyTrend, TrackingOutcome};
pub use crate::config::{EngineConfig, ForecastParameters};
pub use crate::data::{DataLoader, HistoricalPoint, HistoricalSeries};
pub use crate::engine::{ForecastEngine, ForecastResult};
pub use crate::ensemble::EnsembleBlender;
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastModel, ModelFit, SeasonalForecaster, TrailingAverageModel};
pub use crate::period::PeriodKey;
pub use crate::policy::{FetchOutcome, FetchPolicy};
pub use crate::validator::{ConfidenceLabel, ForecastValidator, ValidationOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
