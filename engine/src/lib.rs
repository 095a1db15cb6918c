//! Veriflow engine: runs KYC and KYB verifications end to end.
//!
//! The engine is the central coordinator that:
//! - Accepts requests at intake and queues them with backpressure
//! - Acquires an evidence snapshot from the external data source
//! - Fans the snapshot out to every registered agent under per-agent ceilings
//! - Runs one KYC sub-verification per beneficial owner of a business
//! - Compiles the results into a report under the mandatory/advisory policy
//! - Drives each request through `pending → processing → completed | failed`

pub mod acquisition;
pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod shutdown;
pub mod tracing_spans;
pub mod ubo;
pub mod workflow;

pub use acquisition::{AcquisitionError, Acquirer};
pub use compiler::{overall_status, templated_summary, CompilationError, Compiler};
pub use config::{EngineConfig, IntegrationsConfig, RetryConfig};
pub use engine::{ReportStatus, VerificationEngine};
pub use error::EngineError;
pub use logging::{init_logging, LogFormat};
pub use metrics::EngineMetrics;
pub use registry::{InFlight, Phase};
pub use shutdown::ShutdownController;
