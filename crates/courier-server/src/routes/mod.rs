// Export route modules
pub mod prompt;
pub mod version;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(prompt::routes(state))
        .merge(version::routes())
}
