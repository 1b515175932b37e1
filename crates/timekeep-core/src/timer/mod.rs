mod engine;

pub use engine::{
    ActiveTimer, StartAction, TaskRef, TimerEngine, TimerPhase, TimerSnapshot,
};
