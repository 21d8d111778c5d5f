pub mod expense;
pub mod property;

pub use expense::Expense;
pub use property::Property;
