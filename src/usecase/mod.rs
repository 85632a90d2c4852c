//! Business operations over the store contracts

pub mod logs;
pub mod users;

pub use logs::LogUsecase;
pub use users::UserUsecase;
