use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthGate;
use crate::config::Args;
use crate::dispatcher::Dispatcher;
use crate::rate_limit::RateLimiter;

// app's shared state, built once at startup
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub dispatcher: Dispatcher,
    pub auth: AuthGate,
}

impl AppState {
    pub fn new(rate_limiter: RateLimiter, dispatcher: Dispatcher, auth: AuthGate) -> Arc<Self> {
        Arc::new(Self {
            rate_limiter,
            dispatcher,
            auth,
        })
    }

    pub fn from_config(args: &Args) -> Arc<Self> {
        Self::new(
            RateLimiter::new(
                args.rate_limit_max_requests,
                Duration::from_secs(args.rate_limit_window_seconds),
            ),
            Dispatcher::from_config(args),
            AuthGate::from_config(args),
        )
    }
}
