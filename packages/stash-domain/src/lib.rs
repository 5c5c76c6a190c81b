pub mod hierarchy;
pub mod text;
pub mod vector;
