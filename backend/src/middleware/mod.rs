pub mod identity;

pub use identity::{RequestUser, USER_ID_HEADER};
