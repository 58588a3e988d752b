pub mod server;

use crate::api::handlers::auth::lockout::EscalationMode;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        token_ttl_minutes: i64,
        allowed_origins: Vec<String>,
        escalation: EscalationMode,
    },
}
