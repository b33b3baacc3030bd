pub mod convert;
pub mod load;
pub mod query;
