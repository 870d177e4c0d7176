pub mod csv_source;
pub mod orchestrator;
pub mod settings;
pub mod yahoo;

pub use csv_source::CsvProvider;
pub use orchestrator::{BucketReport, CycleOutcome, CycleReport, Orchestrator};
pub use settings::Settings;
pub use yahoo::YahooClient;
