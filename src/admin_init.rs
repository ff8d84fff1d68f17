//! Admin user initialization

use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::services::accounts;
use crate::store::Store;

/// Ensure the configured admin account exists on startup.
///
/// Does nothing unless both `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
pub async fn ensure_admin_user(store: &dyn Store, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin.email, &config.admin.password) else {
        info!("No admin bootstrap configured");
        return Ok(());
    };

    match accounts::ensure_admin(
        store,
        email,
        password,
        config.admin.name.clone(),
        config.jwt.bcrypt_cost,
    )
    .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "Admin user ready");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Failed to ensure admin user");
            Err(e)
        }
    }
}
