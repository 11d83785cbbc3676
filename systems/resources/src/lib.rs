#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Depletion and regrowth bookkeeping for harvestable resource nodes.
//!
//! Local harvests and authoritative server messages both flow through the
//! [`ResourceNodeRegistry`]. Local regrowth timers are a visual approximation;
//! any authoritative depletion or respawn replaces local state outright.
//! Regrowth for every node is driven by a single scheduler advanced from the
//! wall clock, so no node ever holds more than one live schedule.

use std::{collections::BTreeMap, time::Duration};

use hearthvale_core::NodeKey;
use thiserror::Error;
use tracing::{debug, info};

mod scheduler;

use scheduler::RegrowthScheduler;

/// Capacity and regrowth pacing shared by every node of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeSpec {
    /// Resource units held by a full node. Always at least one.
    pub max_resources: u32,
    /// Time for a depleted node to regrow completely.
    pub respawn_time: Duration,
}

impl NodeSpec {
    /// Creates a node specification, raising `max_resources` to at least one.
    #[must_use]
    pub fn new(max_resources: u32, respawn_time: Duration) -> Self {
        Self {
            max_resources: max_resources.max(1),
            respawn_time,
        }
    }

    /// Gap between two regrowth increments.
    #[must_use]
    pub fn regrowth_interval(&self) -> Duration {
        self.respawn_time / self.max_resources.max(1)
    }
}

/// Read-only state of a single node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNode {
    /// Key identifying the node.
    pub key: NodeKey,
    /// Capacity and regrowth pacing.
    pub spec: NodeSpec,
    /// Units left to harvest.
    pub resource_count: u32,
    /// Set exactly when `resource_count` is zero.
    pub depleted: bool,
    regrowing: bool,
    generation: u64,
}

impl ResourceNode {
    fn full(key: NodeKey, spec: NodeSpec) -> Self {
        Self {
            key,
            spec,
            resource_count: spec.max_resources,
            depleted: false,
            regrowing: false,
            generation: 0,
        }
    }

    /// Capacity of the node.
    #[must_use]
    pub fn max_resources(&self) -> u32 {
        self.spec.max_resources
    }

    /// Whether a regrowth schedule is running for the node.
    #[must_use]
    pub fn is_regrowing(&self) -> bool {
        self.regrowing
    }
}

/// Reasons a local harvest may be rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum HarvestError {
    /// No node is registered under the key.
    #[error("there is nothing to harvest here")]
    UnknownNode,
    /// The node has no resources left.
    #[error("this resource is depleted")]
    Depleted,
    /// The node is regrowing and holds its capacity until it is full again.
    #[error("this resource is still regrowing")]
    Regrowing,
}

/// Notifications emitted while node state changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceEvent {
    /// A unit was harvested locally.
    Harvested {
        /// Node that was harvested.
        key: NodeKey,
        /// Units left afterwards.
        remaining: u32,
    },
    /// The node reached zero, locally or by authority.
    Depleted {
        /// Node that was depleted.
        key: NodeKey,
        /// Whether the change came from the server.
        authoritative: bool,
    },
    /// A regrowth increment added one unit.
    Regrew {
        /// Node that regrew.
        key: NodeKey,
        /// Units held after the increment.
        count: u32,
    },
    /// The server set the node's count.
    Respawned {
        /// Node that respawned.
        key: NodeKey,
        /// Units held afterwards.
        count: u32,
    },
}

/// Tracks remaining units, depletion and regrowth for every node.
#[derive(Debug, Default)]
pub struct ResourceNodeRegistry {
    nodes: BTreeMap<NodeKey, ResourceNode>,
    scheduler: RegrowthScheduler,
    clock: Duration,
}

impl ResourceNodeRegistry {
    /// Creates an empty registry with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a full node. Returns `false` if the key is already known.
    pub fn register(&mut self, key: NodeKey, spec: NodeSpec) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        let _ = self
            .nodes
            .insert(key.clone(), ResourceNode::full(key, spec));
        true
    }

    /// State of a single node.
    #[must_use]
    pub fn node(&self, key: &NodeKey) -> Option<&ResourceNode> {
        self.nodes.get(key)
    }

    /// Every registered node in key order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Units left on a node.
    #[must_use]
    pub fn resource_count(&self, key: &NodeKey) -> Option<u32> {
        self.node(key).map(|node| node.resource_count)
    }

    /// Current reading of the registry's wall clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Number of nodes with a running regrowth schedule.
    #[must_use]
    pub fn active_schedules(&self) -> usize {
        self.nodes.values().filter(|node| node.regrowing).count()
    }

    /// Checks whether a harvest would currently be accepted.
    pub fn can_harvest(&self, key: &NodeKey) -> Result<(), HarvestError> {
        let node = self.nodes.get(key).ok_or(HarvestError::UnknownNode)?;
        if node.resource_count == 0 {
            return Err(HarvestError::Depleted);
        }
        if node.regrowing {
            return Err(HarvestError::Regrowing);
        }
        Ok(())
    }

    /// Removes one unit from the node, starting regrowth when it reaches zero.
    ///
    /// Returns the units left afterwards.
    pub fn harvest(
        &mut self,
        key: &NodeKey,
        out: &mut Vec<ResourceEvent>,
    ) -> Result<u32, HarvestError> {
        self.can_harvest(key)?;
        let now = self.clock;
        let node = self.nodes.get_mut(key).ok_or(HarvestError::UnknownNode)?;

        node.resource_count -= 1;
        let remaining = node.resource_count;
        out.push(ResourceEvent::Harvested {
            key: key.clone(),
            remaining,
        });

        if remaining == 0 {
            deplete(node, &mut self.scheduler, now);
            debug!(node = %key, "node depleted locally");
            out.push(ResourceEvent::Depleted {
                key: key.clone(),
                authoritative: false,
            });
        }
        Ok(remaining)
    }

    /// Authoritative depletion: zero the node and restart its regrowth schedule.
    pub fn apply_depleted(&mut self, key: &NodeKey, out: &mut Vec<ResourceEvent>) -> bool {
        let now = self.clock;
        let Some(node) = self.nodes.get_mut(key) else {
            debug!(node = %key, "depletion for unknown node ignored");
            return false;
        };

        deplete(node, &mut self.scheduler, now);
        out.push(ResourceEvent::Depleted {
            key: key.clone(),
            authoritative: true,
        });
        true
    }

    /// Authoritative respawn: set the exact count (full when `None`) and stop regrowth.
    pub fn apply_respawned(
        &mut self,
        key: &NodeKey,
        count: Option<u32>,
        out: &mut Vec<ResourceEvent>,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            debug!(node = %key, "respawn for unknown node ignored");
            return false;
        };

        let count = count.unwrap_or(node.spec.max_resources).min(node.spec.max_resources);
        if count == 0 {
            return self.apply_depleted(key, out);
        }

        node.resource_count = count;
        node.depleted = false;
        node.regrowing = false;
        node.generation = node.generation.wrapping_add(1);
        out.push(ResourceEvent::Respawned {
            key: key.clone(),
            count,
        });
        true
    }

    /// Advances the wall clock, firing every regrowth increment now due.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<ResourceEvent>) {
        self.clock = self.clock.saturating_add(dt);

        while let Some(tick) = self.scheduler.pop_due(self.clock) {
            let Some(node) = self.nodes.get_mut(&tick.key) else {
                continue;
            };
            if !node.regrowing || node.generation != tick.generation {
                continue;
            }

            node.resource_count = (node.resource_count + 1).min(node.spec.max_resources);
            node.depleted = false;
            out.push(ResourceEvent::Regrew {
                key: tick.key.clone(),
                count: node.resource_count,
            });

            if node.resource_count < node.spec.max_resources {
                let due = tick.due.saturating_add(node.spec.regrowth_interval());
                self.scheduler.schedule(due, tick.key, tick.generation);
            } else {
                node.regrowing = false;
                info!(node = %tick.key, "node fully regrown");
            }
        }
    }
}

fn deplete(node: &mut ResourceNode, scheduler: &mut RegrowthScheduler, now: Duration) {
    node.resource_count = 0;
    node.depleted = true;
    node.regrowing = true;
    node.generation = node.generation.wrapping_add(1);
    let due = now.saturating_add(node.spec.regrowth_interval());
    scheduler.schedule(due, node.key.clone(), node.generation);
}

#[cfg(test)]
mod tests {
    use hearthvale_core::{NodeKind, Tile};

    use super::*;

    fn tree() -> NodeKey {
        NodeKey::new(NodeKind::new("tree"), Tile::new(4, 4))
    }

    fn registry_with_tree(max: u32, respawn_secs: u64) -> ResourceNodeRegistry {
        let mut registry = ResourceNodeRegistry::new();
        assert!(registry.register(tree(), NodeSpec::new(max, Duration::from_secs(respawn_secs))));
        registry
    }

    #[test]
    fn harvest_decrements_until_depleted() {
        let mut registry = registry_with_tree(2, 10);
        let mut events = Vec::new();

        assert_eq!(registry.harvest(&tree(), &mut events), Ok(1));
        assert_eq!(registry.harvest(&tree(), &mut events), Ok(0));

        let node = registry.node(&tree()).expect("node");
        assert!(node.depleted);
        assert!(node.is_regrowing());
        assert_eq!(
            events.last(),
            Some(&ResourceEvent::Depleted {
                key: tree(),
                authoritative: false
            })
        );
        assert_eq!(
            registry.harvest(&tree(), &mut events),
            Err(HarvestError::Depleted)
        );
    }

    #[test]
    fn regrowth_adds_one_unit_per_interval() {
        let mut registry = registry_with_tree(4, 8);
        let mut events = Vec::new();
        for _ in 0..4 {
            let _ = registry.harvest(&tree(), &mut events).expect("harvest");
        }
        events.clear();

        registry.advance(Duration::from_millis(1_999), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(0));

        registry.advance(Duration::from_millis(1), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(1));
        assert!(!registry.node(&tree()).expect("node").depleted);

        registry.advance(Duration::from_secs(60), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(4));
        assert_eq!(registry.active_schedules(), 0);
        assert_eq!(
            events,
            (1..=4)
                .map(|count| ResourceEvent::Regrew { key: tree(), count })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn harvesting_is_refused_until_regrowth_completes() {
        let mut registry = registry_with_tree(2, 4);
        let mut events = Vec::new();
        let _ = registry.harvest(&tree(), &mut events);
        let _ = registry.harvest(&tree(), &mut events);

        registry.advance(Duration::from_secs(2), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(1));
        assert_eq!(registry.can_harvest(&tree()), Err(HarvestError::Regrowing));

        registry.advance(Duration::from_secs(2), &mut events);
        assert_eq!(registry.can_harvest(&tree()), Ok(()));
    }

    #[test]
    fn authoritative_depletion_restarts_the_schedule() {
        let mut registry = registry_with_tree(3, 3);
        let mut events = Vec::new();
        for _ in 0..3 {
            let _ = registry.harvest(&tree(), &mut events);
        }
        registry.advance(Duration::from_millis(1_500), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(1));

        assert!(registry.apply_depleted(&tree(), &mut events));
        assert_eq!(registry.resource_count(&tree()), Some(0));
        assert_eq!(registry.active_schedules(), 1);

        // The superseded tick that was due at 2 s must not fire.
        registry.advance(Duration::from_millis(600), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(0));

        registry.advance(Duration::from_millis(400), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(1));
    }

    #[test]
    fn authoritative_respawn_overrides_local_state() {
        let mut registry = registry_with_tree(5, 10);
        let mut events = Vec::new();
        for _ in 0..5 {
            let _ = registry.harvest(&tree(), &mut events);
        }

        assert!(registry.apply_respawned(&tree(), Some(3), &mut events));
        let node = registry.node(&tree()).expect("node");
        assert_eq!(node.resource_count, 3);
        assert!(!node.depleted);
        assert!(!node.is_regrowing());

        registry.advance(Duration::from_secs(30), &mut events);
        assert_eq!(registry.resource_count(&tree()), Some(3));

        assert!(registry.apply_respawned(&tree(), None, &mut events));
        assert_eq!(registry.resource_count(&tree()), Some(5));

        assert!(registry.apply_respawned(&tree(), Some(99), &mut events));
        assert_eq!(registry.resource_count(&tree()), Some(5));
    }

    #[test]
    fn respawn_to_zero_counts_as_depletion() {
        let mut registry = registry_with_tree(2, 2);
        let mut events = Vec::new();

        assert!(registry.apply_respawned(&tree(), Some(0), &mut events));

        let node = registry.node(&tree()).expect("node");
        assert!(node.depleted);
        assert!(node.is_regrowing());
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let mut registry = ResourceNodeRegistry::new();
        let mut events = Vec::new();

        assert_eq!(
            registry.harvest(&tree(), &mut events),
            Err(HarvestError::UnknownNode)
        );
        assert!(!registry.apply_depleted(&tree(), &mut events));
        assert!(!registry.apply_respawned(&tree(), None, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let mut registry = registry_with_tree(2, 2);
        assert!(!registry.register(tree(), NodeSpec::new(9, Duration::from_secs(1))));
        assert_eq!(registry.resource_count(&tree()), Some(2));
    }
}
