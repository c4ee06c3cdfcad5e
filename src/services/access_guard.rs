use crate::models::{INSTITUTION_ROLE, Route, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthenticated,
    TokenExpired,
    WrongRole(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: Route, reason: DenyReason },
}

/// `token_expired` is the result of the session store's expiry check, run by the caller.
pub fn evaluate_access(session: &SessionSnapshot, token_expired: bool) -> GuardDecision {
    let reason = if !session.is_authenticated {
        Some(DenyReason::NotAuthenticated)
    } else if token_expired {
        Some(DenyReason::TokenExpired)
    } else if session.current_user.role != INSTITUTION_ROLE {
        Some(DenyReason::WrongRole(session.current_user.role.clone()))
    } else {
        None
    };

    match reason {
        None => GuardDecision::Allow,
        Some(reason) => GuardDecision::Redirect {
            to: Route::Institution,
            reason,
        },
    }
}

impl DenyReason {
    pub fn describe(&self) -> String {
        match self {
            DenyReason::NotAuthenticated => "Sign in to view league submissions.".to_string(),
            DenyReason::TokenExpired => "Your session has expired. Sign in again.".to_string(),
            DenyReason::WrongRole(role) if role.is_empty() => {
                "This account has no role. An institution account is required.".to_string()
            }
            DenyReason::WrongRole(role) => {
                format!("Role '{role}' cannot view league submissions. An institution account is required.")
            }
        }
    }
}
