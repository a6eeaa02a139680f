pub mod action;
pub mod agent;
pub mod blade;
pub mod config;
pub mod footprint;
pub mod terrain;
pub mod world;

pub use action::Action;
pub use agent::{Agent, AgentPose, BladeGeometry};
pub use config::{EnvMode, SimConfig, SimConfigError, TerrainProfile};
pub use terrain::TerrainField;
pub use world::{SimError, StepOutcome, World, WorldInitError};
