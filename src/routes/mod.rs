pub mod activity;
pub mod health;
pub mod reports;
pub mod run;
pub mod runs;
