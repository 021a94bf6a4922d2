use std::collections::BTreeMap;

/// Checks a submitted credential pair.
pub trait AuthProvider: Send + Sync {
    fn verify(&self, identity: &str, secret: &str) -> bool;
}

/// Accounts fixed at start from configuration.
///
/// Secrets are compared as plain strings; hashing them is left to deployment.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthProvider {
    users: BTreeMap<String, String>,
}

impl StaticAuthProvider {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn verify(&self, identity: &str, secret: &str) -> bool {
        self.users.get(identity).is_some_and(|s| s == secret)
    }
}
