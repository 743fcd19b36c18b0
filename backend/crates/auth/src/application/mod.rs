//! Application Layer
//!
//! Use cases and application services.

pub mod change_password;
pub mod config;
pub mod current_user;
pub mod login;
pub mod logout;
pub mod manage_users;
pub mod password_reset;
pub mod refresh;
pub mod register;
pub mod token_codec;
pub mod tokens;

// Re-exports
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase};
pub use config::{AuthConfig, ConfigError, TokenSettings};
pub use current_user::CurrentUserUseCase;
pub use login::{AuthOutcome, LoginInput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use manage_users::{ManageUsersUseCase, UpdateUserInput};
pub use password_reset::{LogResetDelivery, PasswordResetUseCase, ResetDelivery, ResetTicket};
pub use refresh::RefreshUseCase;
pub use register::{RegisterInput, RegisterUseCase};
pub use token_codec::{SignedToken, TokenClaims, TokenCodec};
pub use tokens::{IssuedTokens, TokenIssuer};
