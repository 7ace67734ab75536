/// Authentication module
///
/// Token issuance/verification, claims derivation, password hashing and
/// the authorization gate.

mod claims;
mod gate;
mod jwt;
mod password;
mod policy;

pub use claims::{AdditionalClaims, TokenClaims, TokenType};
pub use gate::{authorize, bearer_token, Requirements};
pub use jwt::{TokenPair, TokenService};
pub use password::{BcryptHasher, PasswordHasher};
pub use policy::{ClaimsPolicy, EmployeeAllowlist};
