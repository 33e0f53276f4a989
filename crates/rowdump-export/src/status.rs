//! Export job lifecycle

use serde::{Deserialize, Serialize};

/// Export job status
///
/// `Idle -> Planning -> Fetching -> Encoding -> Delivering -> Completed`, with
/// `Failed` reachable from every running state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Planning,
    Fetching { completed: usize, total: usize },
    Encoding,
    Delivering,
    Completed,
    Failed { reason: String },
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Planning => "planning",
            JobStatus::Fetching { .. } => "fetching",
            JobStatus::Encoding => "encoding",
            JobStatus::Delivering => "delivering",
            JobStatus::Completed => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }

    /// True while a run is in progress
    pub fn is_busy(&self) -> bool {
        !matches!(self, JobStatus::Idle | JobStatus::Completed | JobStatus::Failed { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Fetching { completed, total } => {
                write!(f, "fetching ({}/{} pages)", completed, total)
            },
            JobStatus::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
