use chrono::Duration;

/// The composite identity a limit is keyed by.
///
/// Combining ip and user-agent with the optional authenticated user id keeps
/// anonymous and authenticated traffic from colliding on one counter.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub ip: String,
    pub user_agent: String,
    pub user_id: Option<i64>,
}

impl ClientIdentity {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Composite store key.
    pub fn key(&self) -> String {
        match self.user_id {
            Some(id) => format!("{}|{}|{id}", self.ip, self.user_agent),
            None => format!("{}|{}|-", self.ip, self.user_agent),
        }
    }
}

/// A named rate-limit profile: attempt budget, window, and block duration.
#[derive(Debug, Clone)]
pub struct Limit {
    pub(crate) max_attempts: u32,
    pub(crate) window: Duration,
    pub(crate) block: Duration,
}

impl Limit {
    /// Creates a limit whose block duration defaults to the window size.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            block: window,
        }
    }

    /// Sets an explicit block duration.
    #[must_use]
    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Login profile: 5 attempts per 15 minutes, 30 minute block.
    #[must_use]
    pub fn login() -> Self {
        Self::new(5, Duration::minutes(15)).with_block(Duration::minutes(30))
    }

    /// Password-reset profile: 3 attempts per hour, 2 hour block.
    #[must_use]
    pub fn password_reset() -> Self {
        Self::new(3, Duration::hours(1)).with_block(Duration::hours(2))
    }

    /// Registration profile: 3 attempts per hour, 1 hour block.
    #[must_use]
    pub fn registration() -> Self {
        Self::new(3, Duration::hours(1))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn block(&self) -> Duration {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_defaults_to_window() {
        let limit = Limit::new(10, Duration::minutes(5));
        assert_eq!(limit.block(), Duration::minutes(5));
    }

    #[test]
    fn test_named_profiles() {
        let login = Limit::login();
        assert_eq!(login.max_attempts(), 5);
        assert_eq!(login.window(), Duration::minutes(15));
        assert_eq!(login.block(), Duration::minutes(30));

        let reset = Limit::password_reset();
        assert_eq!(reset.max_attempts(), 3);
        assert_eq!(reset.block(), Duration::hours(2));

        let registration = Limit::registration();
        assert_eq!(registration.max_attempts(), 3);
        assert_eq!(registration.block(), Duration::hours(1));
    }

    #[test]
    fn test_identity_key_separates_anonymous_and_authenticated() {
        let anonymous = ClientIdentity::new("10.0.0.1", "curl/8");
        let authenticated = ClientIdentity::new("10.0.0.1", "curl/8").with_user(42);
        assert_ne!(anonymous.key(), authenticated.key());
    }
}
