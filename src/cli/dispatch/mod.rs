use crate::{
    api::handlers::auth::lockout::EscalationMode,
    cli::{actions::Action, globals::GlobalArgs},
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .map(|secret| SecretString::from(secret.clone()))
        .ok_or_else(|| anyhow!("missing required argument: --jwt-secret"))?;

    let default_admin_password = matches
        .get_one::<String>("default-admin-password")
        .map(|password| SecretString::from(password.clone()))
        .ok_or_else(|| anyhow!("missing required argument: --default-admin-password"))?;

    let escalation = match matches
        .get_one::<String>("lockout-escalation")
        .map(String::as_str)
    {
        Some("progressive") => EscalationMode::Progressive,
        _ => EscalationMode::Saturating,
    };

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow!("missing required argument: --dsn"))?,
        token_ttl_minutes: matches
            .get_one::<i64>("token-ttl-minutes")
            .copied()
            .unwrap_or(120),
        allowed_origins: matches
            .get_many::<String>("allowed-origin")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        escalation,
    };

    Ok((action, GlobalArgs::new(jwt_secret, default_admin_password)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_server_action() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "warden",
            "--dsn",
            "postgres://localhost/warden",
            "--jwt-secret",
            "secret",
            "--lockout-escalation",
            "progressive",
        ]);

        let (action, globals) = handler(&matches)?;
        let Action::Server {
            port,
            dsn,
            token_ttl_minutes,
            allowed_origins,
            escalation,
        } = action;

        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/warden");
        assert_eq!(token_ttl_minutes, 120);
        assert!(allowed_origins.is_empty());
        assert_eq!(escalation, EscalationMode::Progressive);
        assert_eq!(globals.jwt_secret.expose_secret(), "secret");
        Ok(())
    }
}
