//! Background Tasks Module
//!
//! Contains the tasks a cache runs next to its host callers.
//!
//! # Tasks
//! - Population: fills the cache from the backing directory at startup
//! - Rotation: periodically swaps served blobs for unseen ones from disk

mod population;
mod rotation;

pub(crate) use population::spawn_population_task;
pub(crate) use rotation::spawn_rotation_task;
