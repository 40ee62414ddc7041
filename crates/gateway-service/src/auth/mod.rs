//! Token verification pipeline.
//!
//! - `jwks` - Key resolver: fetches and caches the identity provider's signing keys
//! - `jwt` - Token validator: signature, time, audience and issuer checks
//! - `claims` - Typed claims attached to authenticated requests

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::{Audience, Claims};
pub use jwks::{Jwk, JwksClient, JwksError};
pub use jwt::{JwtValidator, ValidationOutcome, ValidationPolicy};
