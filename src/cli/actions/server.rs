use crate::{
    api,
    api::{handlers::auth::AuthConfig, notify::AlertWorkerConfig},
    cli::{actions::Action, globals::GlobalArgs},
};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            token_ttl_minutes,
            allowed_origins,
            escalation,
        } => {
            let mut auth_config = AuthConfig::new()
                .with_token_ttl_minutes(token_ttl_minutes)
                .with_escalation_mode(escalation);
            for origin in allowed_origins {
                auth_config = auth_config.with_allowed_origin(origin);
            }

            api::new(port, dsn, globals, auth_config, AlertWorkerConfig::new()).await?;
        }
    }

    Ok(())
}
