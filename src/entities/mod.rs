pub mod prelude;

pub mod auth_tokens;
pub mod products;
pub mod users;
