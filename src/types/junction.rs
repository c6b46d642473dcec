//! Signal-plan records.
//!
//! Stored for the assignment's cost functions; nothing here interprets them.

use serde::{Deserialize, Serialize};

/// One phase of a traffic-light plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPhase {
    /// 1-based position in the plan.
    pub index: u32,
    /// Phase duration in seconds.
    pub duration: f64,
    /// Green bit string, one character per signal link.
    pub green: String,
    /// Brake bit string.
    pub brake: String,
    /// Yellow bit string.
    pub yellow: String,
}

/// A signalized junction with its ordered phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlJunction {
    /// Junction label.
    pub label: String,
    /// Phases in plan order.
    pub phases: Vec<SignalPhase>,
    /// Number of phases declared by the plan.
    pub phase_count: u32,
}

impl TlJunction {
    /// Create a junction without phases.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            phases: Vec::new(),
            phase_count: 0,
        }
    }

    /// Append a phase, numbering it after the existing ones.
    pub fn push_phase(&mut self, duration: f64, green: &str, brake: &str, yellow: &str) {
        let index = self.phases.len() as u32 + 1;
        self.phases.push(SignalPhase {
            index,
            duration,
            green: green.to_string(),
            brake: brake.to_string(),
            yellow: yellow.to_string(),
        });
        self.phase_count = self.phases.len() as u32;
    }

    /// Overwrite phase `index` with updated timing.
    ///
    /// Bit strings arrive in reverse link order and are stored reversed.
    /// Returns `false` if no phase has that index.
    pub fn update_phase(&mut self, index: u32, duration: f64, green: &str, brake: &str, yellow: &str) -> bool {
        self.phase_count = self.phase_count.max(index);
        match self.phases.iter_mut().find(|p| p.index == index) {
            Some(phase) => {
                phase.duration = duration;
                phase.green = green.chars().rev().collect();
                phase.brake = brake.chars().rev().collect();
                phase.yellow = yellow.chars().rev().collect();
                true
            }
            None => false,
        }
    }

    /// Cycle time: sum of all phase durations.
    pub fn cycle_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }
}
