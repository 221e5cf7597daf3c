pub mod account;
pub mod extlogin;
pub mod home;
