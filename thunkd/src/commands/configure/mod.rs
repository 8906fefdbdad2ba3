pub mod configure_cli;
