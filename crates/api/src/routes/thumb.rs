//! Route definition for thumbnail extraction.
//!
//! ```text
//! GET /thumb?url=&w=&h=&t=    get_thumb
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::thumb;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/thumb", get(thumb::get_thumb))
}
