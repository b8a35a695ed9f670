mod handler;

pub use handler::register;
