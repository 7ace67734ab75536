/// Middleware module
///
/// Custom middleware for authentication and request logging.

mod token_gate;

pub use token_gate::TokenGate;
