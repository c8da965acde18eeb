// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware
//
// Every handler resolves the caller's stored account from the token email
// before acting; role checks happen in the services.
pub mod assets;
pub mod employees;
pub mod payments;
pub mod requests;

pub use assets::get as assets_get;
pub use assets::post as assets_post;

pub use requests::get as requests_get;
pub use requests::post as requests_post;
pub use requests::patch as request_patch;

pub use employees::get as employees_get;
pub use employees::delete as employees_delete;

pub use payments::checkout_post;
pub use payments::verify as payment_verify;
pub use payments::get as payments_get;
