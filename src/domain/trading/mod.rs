// Core trading domain entities and validation rules
pub mod rules;
pub mod types;
