pub mod expression;
pub mod query;
