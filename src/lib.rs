//! FairStay - turns free-form tenant complaints into structured records.
//!
//! A complaint goes to a locally hosted language model (Ollama) under a hard
//! deadline. The model's reply is mined for a JSON object, which is coerced
//! into a [`ClassificationResult`]: one category from a closed set, a
//! severity from 1 to 5 and a short neutral summary. Whenever the model is
//! slow, unreachable or unintelligible, a deterministic fallback record built
//! from the complaint text is returned instead, so callers always get a valid
//! record and never an error.
//!
//! # Example
//!
//! ```no_run
//! use fairstay::{Classifier, ClassifierConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     fairstay::setup_logging();
//!
//!     let config = ClassifierConfig::from_env();
//!     let classifier = Classifier::new(&config);
//!
//!     let record = classifier
//!         .classify_and_summarize("Neighbours play loud music every night until 3am.")
//!         .await;
//!     println!("{} ({}): {}", record.category, record.severity, record.summary);
//! }
//! ```

pub mod ai;
pub mod classifier;
pub mod core;
pub mod errors;
pub mod prompt;

pub use ai::{OllamaClient, TextGenerator};
pub use classifier::{Classifier, fallback};
pub use crate::core::config::ClassifierConfig;
pub use crate::core::models::{Category, ClassificationResult};
pub use errors::ClassifyError;

/// Configure structured logging with JSON output.
///
/// Log level comes from `RUST_LOG` and defaults to `info`. Call once at
/// process start.
///
/// # Example
///
/// ```
/// fairstay::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
