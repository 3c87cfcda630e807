pub mod backend;
pub mod geocode;
pub mod routing;
