pub mod error;
mod retry;
pub mod run;
pub mod stock;
pub mod transport;
pub mod weather;

pub use error::ScrapeError;
pub use run::{ErrorRecord, RunResult};
pub use stock::StockSource;
pub use transport::{ScrapeClient, ScrapeSettings};
pub use weather::WeatherSource;
