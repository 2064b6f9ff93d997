pub mod password;
pub mod policy;
pub mod refresh;
pub mod token;

pub use policy::{AuthAction, Role, can_perform};
pub use refresh::RefreshTokenManager;
pub use token::{Claims, TokenSigner};
