pub mod account;
pub mod affiliation;
pub mod asset;
pub mod package;
pub mod payment;
pub mod request;

pub use account::Account;
pub use affiliation::Affiliation;
pub use asset::{Asset, AssetFilter};
pub use package::Package;
pub use payment::PaymentRecord;
pub use request::{Request, RequestFilter, RequestTransition};
