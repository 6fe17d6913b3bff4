pub use super::auth_tokens::Entity as AuthTokens;
pub use super::products::Entity as Products;
pub use super::users::Entity as Users;
