//! Command handlers for the Stock Insights CLI.

pub mod news;
pub mod records;
pub mod stats;
pub mod stock;
pub mod sync;

pub use news::NewsCommand;
pub use records::RecordsCommand;
pub use stats::StatsCommand;
pub use stock::StockCommand;
pub use sync::SyncCommand;
