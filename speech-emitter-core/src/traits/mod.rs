pub mod capture_delegate;
pub mod capture_platform;
