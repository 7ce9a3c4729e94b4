/// Tally authentication and ownership layer.
///
/// - `credentials`: registration and password checks
/// - `session`: opaque bearer tokens with a hard expiry, purged lazily
/// - `mediator`: the only way to reach expense storage; every call is
///   resolved to an owner before it touches the store
pub mod clock;
pub mod credentials;
pub mod error;
pub mod mediator;
pub mod password;
pub mod session;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialStore;
pub use error::{AccessError, AuthError, Rejection};
pub use mediator::AccessMediator;
pub use password::PasswordScheme;
pub use session::{IssuedSession, SessionManager, SessionStatus, TokenState};
