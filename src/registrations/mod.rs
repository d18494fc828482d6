mod handlers;
pub mod ledger;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use ledger::LedgerError;
pub use repo::Registration;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
