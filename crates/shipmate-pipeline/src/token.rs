//! Token acquisition

use shipmate_core::{OperatorGate, Reporter};
use shipmate_host::{HostError, Token};

use crate::error::Result;

/// Pick the token to use for this run
///
/// An explicit token wins over one supplied by the operator. A token that
/// does not look like a personal access token is only dropped if the
/// operator agrees to continue without one; read-only flows then run
/// unauthenticated while tag publication still refuses to start.
pub fn acquire_token(
    explicit: Option<String>,
    gate: &dyn OperatorGate,
    reporter: &dyn Reporter,
) -> Result<Option<Token>> {
    let token = Token::from_input(explicit).or_else(|| Token::from_input(gate.provide_token()));

    match token {
        Some(token) if token.looks_valid() => Ok(Some(token)),
        Some(_) => {
            reporter.warn("Token does not look like a GitHub personal access token");
            if gate.confirm("Continue without a token?", None) {
                Ok(None)
            } else {
                Err(HostError::InvalidToken.into())
            }
        }
        None => {
            tracing::debug!("no token provided");
            Ok(None)
        }
    }
}
