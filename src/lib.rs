pub mod energy;
pub mod engine;
pub mod forecast;
pub mod geo;
pub mod rng;
pub mod scenario;
pub mod selector;
pub mod snapshot;
pub mod systems;
pub mod track;
pub mod world;
