pub mod catalog;
pub mod formation;
pub mod rules;
