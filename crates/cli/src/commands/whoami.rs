//! Backend session check.

use doorstep_checkout::{ClientConfig, HttpBackend};
use tracing::{info, warn};

/// Report which user the configured credentials belong to.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or answers with
/// something other than a session status.
pub async fn run(config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&config.api)?;
    let session = backend.fetch_session().await?;

    match session.user_info.filter(|_| session.status) {
        Some(user) => info!(
            user_id = %user.id,
            username = user.username.as_deref().unwrap_or("-"),
            email = user.email.as_deref().unwrap_or("-"),
            "Signed in"
        ),
        None => warn!(api = %config.api.base_url, "Not signed in"),
    }
    Ok(())
}
