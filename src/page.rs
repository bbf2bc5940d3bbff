pub mod login;
pub mod signup;
pub mod tasks;
