pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{BootstrapResult, bootstrap_workspace};
pub use application::commands::AppState;
pub use application::event_store::EventStore;
pub use application::suggestions::{PendingBatch, SuggestionService};
pub use domain::error::ValidationError;
pub use domain::models::{CalendarEvent, CandidateEvent, EventType};
pub use infrastructure::error::InfraError;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() -> Result<(), InfraError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|error| InfraError::InvalidConfig(format!("failed to set up logging: {error}")))
}
