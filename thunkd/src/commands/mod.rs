pub mod configure;
pub mod project;
