pub mod health;
pub mod new_customers;
