// Authentication module
// Manages the access token lifecycle: login, refresh and expiry checks

mod credentials;
pub mod jwt;
mod manager;
mod refresh;
mod single_flight;
mod types;

pub use credentials::Credentials;
pub use jwt::{is_token_expired, DEFAULT_EXPIRY_BUFFER_SECS};
pub use manager::TokenManager;
pub use refresh::{LOGIN_PATH, REFRESH_PATH};
pub use single_flight::SingleFlight;
pub use types::{extract_token, TOKEN_FIELDS};
