// Library exports for animedash

pub mod csv_reader;
pub mod bucket;
pub mod aggregate;
pub mod scale;
pub mod palette;
pub mod rank;
pub mod enrich;
pub mod state;
pub mod dashboard;
pub mod render;
