pub mod health;
pub mod thumb;
