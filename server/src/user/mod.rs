pub(crate) mod user;

pub use user::*;
