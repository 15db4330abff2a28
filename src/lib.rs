//! damage-assess - orchestration of disaster damage assessment runs
//!
//! A run turns before/after imagery of a disaster area into training
//! examples and optionally sends a sample of them out for human labeling:
//!
//! 1. building centroids are read from a file or discovered through
//!    OpenStreetMap inside an area of interest,
//! 2. labeled points are read from a vector file,
//! 3. an external engine generates examples for all coordinates,
//! 4. a labeler pool and a labeling job are set up on Vertex AI.
//!
//! # Examples
//!
//! ```no_run
//! use damage_assess::generate::CommandGenerator;
//! use damage_assess::open_street_map::{OverpassClient, DEFAULT_OVERPASS_URL};
//! use damage_assess::pipeline::{run_generate_examples, Collaborators};
//! # async fn run(config: damage_assess::config::GenerateExamplesConfig) -> damage_assess::Result<()> {
//! let finder = OverpassClient::new(DEFAULT_OVERPASS_URL)?;
//! let generator = CommandGenerator::from_command_line("skai-generate-examples")?;
//!
//! let summary = run_generate_examples(
//!     &config,
//!     &Collaborators { buildings: &finder, generator: &generator, labeling: None },
//! )
//! .await?;
//! println!("Import file: {}", summary.import_file);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod projection;
pub mod geometry;
pub mod formats;
pub mod open_street_map;
pub mod buildings;
pub mod labels;
pub mod generate;
pub mod manifest;
pub mod labeling;
pub mod cli;
pub mod config;
pub mod pipeline;

pub use error::{Error, Result};
pub use types::{BuildingCentroid, LabeledCoordinate, Region};
pub use projection::{Coordinate, Transformer};
