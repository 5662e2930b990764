pub mod app;
pub mod authenticator;
pub mod backend;
pub mod config;
pub mod guard;
pub mod profile;
pub mod registration;
pub mod resources;
pub mod session;
pub mod storage;
pub mod verifier;

pub use app::AdminApp;
pub use authenticator::Authenticator;
pub use backend::{ApiClient, IdentityProvider, LoginResponse};
pub use config::{load_client_config, ClientConfig, StorageKind};
pub use guard::{GuardDecision, Navigation, Navigator, RouteGuard};
pub use session::{Generation, Session, SessionHandle, SessionSnapshot, SessionStore, Verification};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use verifier::{IdentityVerifier, VerificationOutcome};
