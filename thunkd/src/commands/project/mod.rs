pub mod clean;
pub mod modular;
pub mod project_cli;
