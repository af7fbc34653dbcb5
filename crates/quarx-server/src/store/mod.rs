pub mod db;
pub mod error;
pub mod model;

pub use db::{Store, TEST_LICENSE_DAYS, TEST_LICENSE_KEY};
pub use error::StoreError;
pub use model::LicenseRecord;
