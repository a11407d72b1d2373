use clap::Parser;
use clap::builder::BoolishValueParser;

use crate::auth::GOOGLE_TOKENINFO_URL;

// CLI arguments, each one also readable from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway")]
#[command(about = "Authenticated, rate-limited gateway for Vertex AI chat")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // GCP project hosting the model
    #[arg(long, env = "GCP_PROJECT")]
    pub gcp_project: Option<String>,

    #[arg(long, env = "GCP_LOCATION", default_value = "us-central1")]
    pub gcp_location: String,

    #[arg(long, env = "VERTEX_MODEL", default_value = "text-bison")]
    pub vertex_model: String,

    // Overrides https://{location}-aiplatform.googleapis.com
    #[arg(long, env = "VERTEX_ENDPOINT")]
    pub vertex_endpoint: Option<String>,

    // OAuth access token sent to Vertex AI
    #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
    pub vertex_access_token: Option<String>,

    // Serve stub responses instead of calling the backend
    #[arg(long, env = "OFFLINE_MODE", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    pub offline_mode: bool,

    #[arg(long, env = "REQUIRE_AUTH", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    pub require_auth: bool,

    // Expected `aud` claim of caller ID tokens
    #[arg(long, env = "AUTH_AUDIENCE")]
    pub auth_audience: Option<String>,

    // Empty disables token verification entirely
    #[arg(long, env = "AUTH_TOKENINFO_URL", default_value = GOOGLE_TOKENINFO_URL)]
    pub auth_tokeninfo_url: String,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_limit_window_seconds: u64,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 30)]
    pub rate_limit_max_requests: usize,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_offline_and_auth_required() {
        let args = Args::try_parse_from(["chat-gateway"]).unwrap();

        assert!(args.offline_mode);
        assert!(args.require_auth);
        assert_eq!(args.vertex_model, "text-bison");
        assert_eq!(args.gcp_location, "us-central1");
        assert_eq!(args.rate_limit_window_seconds, 60);
        assert_eq!(args.rate_limit_max_requests, 30);
        assert_eq!(args.auth_tokeninfo_url, GOOGLE_TOKENINFO_URL);
    }

    #[test]
    fn boolean_flags_accept_boolish_values() {
        let args = Args::try_parse_from([
            "chat-gateway",
            "--offline-mode",
            "no",
            "--require-auth",
            "0",
            "--rate-limit-max-requests",
            "5",
        ])
        .unwrap();

        assert!(!args.offline_mode);
        assert!(!args.require_auth);
        assert_eq!(args.rate_limit_max_requests, 5);
    }
}
