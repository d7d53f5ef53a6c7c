//! Where the client sends the user when their session cannot be recovered.

/// Login entry point the redirect targets.
pub const LOGIN_PATH: &str = "/login";

pub trait Navigator: Send + Sync {
    /// Called once per unrecoverable refresh failure, after the session is cleared.
    fn redirect_to_login(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Default navigator for headless use: there is nowhere to navigate, so it logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        tracing::warn!(login_path = LOGIN_PATH, "Session ended, sign in again");
    }
}
