//! Alert evaluation for tripwire.
//!
//! - `InputSnapshot`: positions and prices loaded once per cycle
//! - `AlertEvaluator`: extracts an alert's evaluated value and fills config defaults
//! - `LevelStateMachine`: maps a value through threshold bands into a level,
//!   and ratchets the next trigger value for travel alerts
//! - `format_alert_message`: one line of the combined notification

pub mod evaluator;
pub mod level;
pub mod message;
pub mod snapshot;

pub use evaluator::{AlertEvaluator, Enrichment, Evaluation, InputStatus, PositionFigures};
pub use level::{LevelOutcome, LevelStateMachine, MetricDirection};
pub use message::{combine_messages, format_alert_message};
pub use snapshot::InputSnapshot;
