pub mod cookies;
pub mod jwt;
pub mod password;
pub mod upload;

pub use jwt::*;
pub use password::*;
