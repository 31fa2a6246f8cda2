//! `jobcraft-core`: job progression domain.
//!
//! This crate contains **pure domain** logic: job definitions and their
//! curves, per-player progression, and reward computation. No threads, no IO.

pub mod action;
pub mod curve;
pub mod error;
pub mod id;
pub mod job;
pub mod player;
pub mod progression;
pub mod reward;
pub mod title;

pub use action::{ActionInfo, ActionKind};
pub use curve::{ActionReward, CurvePoint, JobCountPenalty, LevelingCurve, RateCurve, Reward};
pub use error::{DomainError, DomainResult};
pub use id::{JobKey, PlayerId};
pub use job::{JobCatalog, JobDefinition, JobDefinitionBuilder, NONE_JOB_NAME};
pub use player::{Departure, PlayerRecord, PlayerSnapshot, ProgressionSnapshot};
pub use progression::{LevelUp, Progression};
pub use reward::{CreditSink, RewardComputer, RewardOutcome};
pub use title::{Title, TitleEntry, TitleLadder};
