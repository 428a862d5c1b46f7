//! Homestead Core -- the simulation core for farm-and-factory economy missions.
//!
//! This crate owns every piece of runtime state that decides whether a mission
//! is won: crop growth in fields, production queues in factory machines, and
//! the mission economy (money, days, satisfaction, star rating).
//!
//! # Step Pipeline
//!
//! Each call to [`sim::Simulation::step`] that crosses the configured interval
//! runs the following phases in order:
//!
//! 1. **Growth** -- Recompute every growing crop from its planting timestamp.
//! 2. **Production** -- Recompute every in-flight product; completed products
//!    are credited and the next queued product starts automatically.
//! 3. **Failure** -- Optionally roll random breakdowns on producing machines.
//! 4. **Calendar** -- Advance the day counter when a day length is configured.
//! 5. **Completion** -- Evaluate the mission-complete query on fresh state.
//!
//! # Timestamp Recomputation
//!
//! Progress is never accumulated. Crops and products store the timestamp at
//! which they started and derive their percentage from `now - started`, so a
//! missed or repeated step cannot drift the result:
//!
//! ```rust,ignore
//! let clock = ManualClock::new(0);
//! let mut sim = Simulation::new(&setup, Catalog::default(), Box::new(clock.clone()));
//! sim.plant(SlotRef::new(FieldKind::Farmland, 0, 1), CropId(7))?;
//! clock.advance_secs(60);
//! sim.force_step();
//! assert_eq!(sim.harvest_crop(SlotRef::new(FieldKind::Farmland, 0, 1))?.count, 1);
//! ```
//!
//! # Key Types
//!
//! - [`sim::Simulation`] -- Per-mission context owning every aggregate.
//! - [`farm::Farm`] -- Fields and crop slots.
//! - [`factory::Factory`] -- Machines and their FIFO production queues.
//! - [`economy::Economy`] -- Money, days, satisfaction and star rating.
//! - [`goal::Goal`] -- Tagged mission goals evaluated against live state.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for progress and chances.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod catalog;
pub mod clock;
pub mod crop;
pub mod economy;
pub mod error;
pub mod event;
pub mod factory;
pub mod farm;
pub mod fixed;
pub mod goal;
pub mod id;
pub mod machine;
pub mod mission;
pub mod persist;
pub mod product;
pub mod query;
pub mod rng;
pub mod serialize;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
