use parking_lot::RwLock;
use zeroize::Zeroizing;

/// Holder for the external board API credential.
///
/// Replaces the ambient module-level token the service historically used:
/// the holder is constructed once at startup, seeded from configuration,
/// and passed explicitly to every component that talks to the board API.
/// The out-of-scope OAuth callback installs a token at runtime via
/// [`BoardCredentials::set`].
#[derive(Debug, Default)]
pub struct BoardCredentials {
    token: RwLock<Option<Zeroizing<String>>>,
}

impl BoardCredentials {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: RwLock::new(initial.filter(|t| !t.is_empty()).map(Zeroizing::new)),
        }
    }

    /// Clone out the current token, if one is installed.
    pub fn token(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| t.as_str().to_string())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Install (or replace) the credential.
    pub fn set(&self, token: String) {
        *self.token.write() = Some(Zeroizing::new(token));
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }
}
