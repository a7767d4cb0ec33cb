use serde::{Deserialize, Serialize};

/// Name and email the bot commits with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            username: username.into(),
            email: email.into(),
        }
    }

    pub fn signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.username, &self.email)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::new("rebasebot", "rebasebot@example.com")
    }
}
