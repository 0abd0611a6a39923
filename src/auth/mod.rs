// Authentication module
// Credential storage, session lifecycle and token refresh

mod credentials;
mod manager;
mod refresh;
mod session;
mod types;

pub use credentials::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use manager::AuthManager;
pub use refresh::REFRESH_PATH;
pub use session::Session;
pub use types::{CredentialPair, SessionEvent, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
