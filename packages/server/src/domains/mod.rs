// Business domains
pub mod exceptions;
