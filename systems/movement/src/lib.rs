#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-driven movement along a checkpoint path.
//!
//! The [`MovementController`] owns the player's continuous position while a
//! move is active. Each animation frame advances the position toward the
//! head checkpoint at a fixed speed. When the queue empties the controller
//! reports completion together with whatever arrival token was registered,
//! without knowing what the move was for.

use std::{collections::VecDeque, time::Duration};

use glam::Vec2;
use hearthvale_core::{Facing, Tile, WorldPos};
use tracing::debug;

/// Walking speed measured in tiles per second.
pub const MOVE_SPEED: f32 = 4.0;

/// Both axis deltas must fall below this distance for a checkpoint to count as reached.
pub const ARRIVAL_EPSILON: f32 = 0.1;

/// Whether the controller is walking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovementState {
    /// Standing still with an empty checkpoint queue.
    Idle,
    /// Walking toward the head of the checkpoint queue.
    Moving,
}

/// Notifications emitted by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MovementEvent<T> {
    /// A new path was accepted.
    Started {
        /// Final checkpoint of the path.
        destination: Tile,
    },
    /// An intermediate or final checkpoint was reached.
    CheckpointReached {
        /// The checkpoint that was reached.
        tile: Tile,
    },
    /// The final checkpoint was reached and the queue is empty.
    Completed {
        /// Tile the controller stopped on.
        tile: Tile,
        /// Token registered for this arrival, if any.
        arrival: Option<T>,
    },
    /// Movement was halted before reaching the destination.
    Cancelled {
        /// Tile containing the position where movement stopped.
        at: Tile,
    },
}

/// Advances a world position along checkpoints over time.
///
/// `T` is an opaque arrival token. Interaction systems register one with
/// [`MovementController::set_arrival`] before (or right after) handing the
/// controller a path; it comes back in [`MovementEvent::Completed`]. Only one
/// token is held at a time.
#[derive(Debug)]
pub struct MovementController<T = ()> {
    position: Vec2,
    facing: Facing,
    checkpoints: VecDeque<Tile>,
    arrival: Option<T>,
}

impl<T> MovementController<T> {
    /// Creates an idle controller standing at the provided position.
    #[must_use]
    pub fn new(position: WorldPos) -> Self {
        Self {
            position: position.as_vec2(),
            facing: Facing::default(),
            checkpoints: VecDeque::new(),
            arrival: None,
        }
    }

    /// Current continuous position.
    #[must_use]
    pub fn position(&self) -> WorldPos {
        WorldPos::from_vec2(self.position)
    }

    /// Tile containing the current position.
    #[must_use]
    pub fn tile(&self) -> Tile {
        self.position().tile()
    }

    /// Current eight-way facing.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Whether the controller is walking.
    #[must_use]
    pub fn state(&self) -> MovementState {
        if self.checkpoints.is_empty() {
            MovementState::Idle
        } else {
            MovementState::Moving
        }
    }

    /// Reports whether a move is in progress.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.state() == MovementState::Moving
    }

    /// Checkpoints still to be visited, head first.
    pub fn remaining(&self) -> impl Iterator<Item = Tile> + '_ {
        self.checkpoints.iter().copied()
    }

    /// Final checkpoint of the active path.
    #[must_use]
    pub fn destination(&self) -> Option<Tile> {
        self.checkpoints.back().copied()
    }

    /// Arrival token currently registered.
    #[must_use]
    pub fn pending_arrival(&self) -> Option<&T> {
        self.arrival.as_ref()
    }

    /// Registers the token returned when the current path completes,
    /// replacing any previous registration.
    pub fn set_arrival(&mut self, token: T) -> Option<T> {
        self.arrival.replace(token)
    }

    /// Removes the registered arrival token without stopping movement.
    pub fn clear_arrival(&mut self) -> Option<T> {
        self.arrival.take()
    }

    /// Starts following a new checkpoint path, discarding any queued checkpoints.
    ///
    /// An empty path is ignored and leaves the controller untouched.
    pub fn follow(&mut self, checkpoints: Vec<Tile>, out: &mut Vec<MovementEvent<T>>) -> bool {
        let Some(destination) = checkpoints.last().copied() else {
            return false;
        };

        self.checkpoints = checkpoints.into();
        debug!(%destination, checkpoints = self.checkpoints.len(), "movement started");
        out.push(MovementEvent::Started { destination });
        true
    }

    /// Halts immediately where the controller stands and drops the arrival token.
    pub fn cancel(&mut self, out: &mut Vec<MovementEvent<T>>) {
        let _ = self.arrival.take();
        if self.checkpoints.is_empty() {
            return;
        }

        self.checkpoints.clear();
        let at = self.tile();
        debug!(%at, "movement cancelled");
        out.push(MovementEvent::Cancelled { at });
    }

    /// Turns in place to face the provided tile.
    pub fn face_towards(&mut self, tile: Tile) {
        let delta = tile.to_world().as_vec2() - self.position;
        if let Some(facing) = Facing::from_vector(delta.x, delta.y) {
            self.facing = facing;
        }
    }

    /// Advances the position by `dt` of animation time.
    ///
    /// The Euclidean displacement within one tick never exceeds
    /// [`MOVE_SPEED`] × `dt`. Checkpoints are snapped onto exactly once reached.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<MovementEvent<T>>) {
        if self.checkpoints.is_empty() {
            return;
        }

        let mut budget = MOVE_SPEED * dt.as_secs_f32();
        while let Some(head) = self.checkpoints.front().copied() {
            let target = head.to_world().as_vec2();
            let delta = target - self.position;
            let distance = delta.length();

            let within_epsilon =
                delta.x.abs() < ARRIVAL_EPSILON && delta.y.abs() < ARRIVAL_EPSILON;
            if within_epsilon && distance <= budget {
                budget -= distance;
                self.position = target;
                let _ = self.checkpoints.pop_front();
                out.push(MovementEvent::CheckpointReached { tile: head });
                continue;
            }

            if budget <= 0.0 {
                break;
            }

            let step = budget.min(distance);
            if let Some(facing) = Facing::from_vector(delta.x, delta.y) {
                self.facing = facing;
            }
            if step >= distance {
                self.position = target;
            } else {
                self.position += delta / distance * step;
            }
            budget -= step;
        }

        if self.checkpoints.is_empty() {
            let tile = self.tile();
            debug!(%tile, "movement complete");
            out.push(MovementEvent::Completed {
                tile,
                arrival: self.arrival.take(),
            });
        }
    }
}

impl<T> Default for MovementController<T> {
    fn default() -> Self {
        Self::new(WorldPos::default())
    }
}
