pub mod evaluate;
pub mod rules;
pub mod validate;
