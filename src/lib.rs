#[macro_use]
extern crate tracing;

pub mod catalog;
pub mod exporter;
pub mod exposition;
pub mod gatherer;
mod logging;
pub mod server;
pub mod sink;

pub use catalog::MetricCatalog;
pub use exporter::Exporter;
pub use logging::{
    init_errors,
    init_logging,
};
pub use server::{
    create_router,
    AppState,
};
