pub mod account;
pub mod statuses;

pub use account::AccountService;
pub use statuses::StatusService;
