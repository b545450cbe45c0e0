pub mod generate;
pub mod project;
pub mod resolver;
pub mod transport;
