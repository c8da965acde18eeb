// handlers/public/mod.rs - endpoints reachable without a bearer token
pub mod packages;
pub mod system;
pub mod token;
pub mod users;

pub use packages::get as packages_get;
pub use system::health;
pub use system::root;
pub use token::post as token_post;
pub use users::post as user_post;
pub use users::role_get as user_role_get;
