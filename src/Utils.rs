//! different utility modules used throughout the project
/// terminal logger for fit sessions
pub mod logger;
/// pretty-printing of fit reports as tables
pub mod report_table;
