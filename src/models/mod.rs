pub mod trip;
pub mod vehicle;
