mod api;
mod health;
mod ledger;

pub use api::api_router;
pub use health::health_router;
pub use ledger::ledger_router;
