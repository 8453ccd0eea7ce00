//! Remote execution client for remex
//!
//! - [`Client::prepare_command`] uploads a Command and its Action and returns
//!   a [`Command`] handle.
//! - [`Command::start`] issues Execute and returns a [`Subscription`] with an
//!   accepted channel (operation name, at most once) and a status channel
//!   (stage updates, then exactly one terminal [`CommandResult`]).
//! - [`Command::replace_wait_using_wait_execution_api`] reattaches to a known
//!   operation through WaitExecution.
//! - [`Client::download_action_outputs`] and
//!   [`Client::get_stdout_and_stderr`] materialize a finished result.

pub mod client;
pub mod command;
pub mod result;
pub mod service;
pub mod testing;

pub use client::Client;
pub use command::{Command, Subscription};
pub use result::{CommandResult, LocalStats, StatsBreakdown};
pub use service::{ExecutionService, OperationStream};
