mod extract;
mod token;

pub use extract::bearer_token;
pub use token::{Claims, JwtKeys, TokenError};
