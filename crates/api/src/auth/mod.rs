//! Session handling for Supercheck

pub mod session;

pub use session::{
    resolve_org_best_effort, JwtSessionResolver, SessionClaims, SessionError, SessionResolver,
    SESSION_COOKIE,
};
