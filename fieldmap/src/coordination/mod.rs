mod context;
mod errors;

pub use context::{AppContext, AuthStatus};
pub use errors::CoordinationError;
