pub mod error;
pub mod policy;

pub use error::SecurityError;
pub use policy::{
    ensure_access, normalize_path, RouteAccess, RouteDescriptor, RouteTable, HOME_PATH,
    SIGN_IN_PATH, UNAUTHORIZED_PATH,
};
