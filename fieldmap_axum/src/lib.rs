//! HTTP surface for fieldmap: the provider redirect at `/`, sign-in and
//! sign-out under `/auth`, and the photo session API under `/api`.

mod auth;
mod error;
mod photos;
mod router;
mod state;

#[cfg(test)]
mod test_utils;

pub use router::{fieldmap_router, fieldmap_router_no_trace};
pub use state::{AppState, app_state};
