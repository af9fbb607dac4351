/// The current state of a request moving through the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Not started yet.
    #[default]
    Idle,

    /// Turning the identifier or custom definition into a profile.
    ResolvingProfile,

    /// DNS, TCP, proxy tunnel and TLS handshake (or pool checkout).
    Negotiating,

    /// Writing the request head and body.
    SendingRequest,

    /// Waiting for and reading the response.
    AwaitingResponse,

    /// Preparing the next hop after a redirect.
    FollowingRedirect,

    /// Finished with a captured response.
    Completed,

    /// Finished with an error.
    Failed,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Completed | LoadState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(LoadState::Completed.is_terminal());
        assert!(LoadState::Failed.is_terminal());
        assert!(!LoadState::default().is_terminal());
        assert!(!LoadState::FollowingRedirect.is_terminal());
    }
}
