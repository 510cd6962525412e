pub mod account;
pub mod jurisdiction;
pub mod login;
