pub mod customers;
pub mod run;
pub mod trace;
