pub mod database;
pub mod metrics;

pub use self::database::StudentDb;
pub use self::metrics::{get_metrics, init_metrics, record_store_operation};
