pub mod convert;
pub mod rules;
