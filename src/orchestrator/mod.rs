//! Application-level orchestration.
//!
//! This module owns the run lifecycle (validate, submit, interpret the reply) and the
//! production of terminal lines. UI/CLI layers only send commands in and consume
//! `PanelEvent`s out.

mod controller;
mod machine;
mod post_process;
mod sink;
mod stepper;


pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use machine::{Orchestrator, ProducerMode, RunOutcome};
pub(crate) use post_process::{export_json, save_transcript, Transcript};
pub(crate) use sink::LogSink;
pub(crate) use stepper::StepperTiming;
