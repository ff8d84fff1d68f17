//! Role-based authorization.
//!
//! Checks only bite when `features.enforce_policies` is on; otherwise every
//! endpoint stays open, as anonymous clients expect.

use crate::error::{AppError, Result};
use crate::models::{article::UpdateArticle, auth::AuthContext, Role};

/// Operations that can be restricted by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Journal, volume and issue writes
    ManageCatalog,
    SubmitArticle,
    /// Moving an article past Draft/Submitted
    ReviewArticle,
    VerifyPayment,
    ManageUsers,
}

pub fn authorize(role: Role, action: Action) -> bool {
    match role {
        Role::Admin => true,
        Role::Reviewer => matches!(action, Action::ReviewArticle | Action::SubmitArticle),
        Role::Publisher => matches!(action, Action::SubmitArticle),
    }
}

/// Enforce `action` for the caller when enforcement is enabled.
pub fn guard(enforce: bool, auth: Option<&AuthContext>, action: Action) -> Result<()> {
    if !enforce {
        return Ok(());
    }

    let auth = auth.ok_or_else(|| AppError::Authentication("Authentication required".to_string()))?;
    if authorize(auth.role, action) {
        Ok(())
    } else {
        tracing::warn!(user_id = %auth.user_id, role = ?auth.role, ?action, "Action denied");
        Err(AppError::Authorization(format!(
            "Role {:?} may not perform {:?}",
            auth.role, action
        )))
    }
}

/// Actions implied by an article update.
pub fn article_update_actions(input: &UpdateArticle) -> Vec<Action> {
    let mut actions = vec![Action::SubmitArticle];
    if input.status.is_some_and(|s| !s.is_author_controlled()) {
        actions.push(Action::ReviewArticle);
    }
    if input.payment_verified.is_some() {
        actions.push(Action::VerifyPayment);
    }
    actions
}
