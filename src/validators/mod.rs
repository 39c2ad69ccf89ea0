pub mod account_validator;
pub mod upload_validator;
