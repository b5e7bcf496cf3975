//! Weighted prize draw and the persisted collection.
//!
//! The draw runs as a three-state machine, `Idle → Drawing → Resolved`,
//! armed only by success appends. Resolution picks from a fixed pool by
//! cumulative weight over an injected random source, so tests can seed it.
//! Won prizes land on the `Shelf`, a capped most-recent-first id list with
//! its own document, independent of the journal.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Most-recent-first shelf capacity; the oldest entry falls off the tail.
pub const COLLECTION_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prize {
    pub id: &'static str,
    pub display_name: &'static str,
    /// 1..=5, 5 being the rarest tier.
    pub rarity_tier: u8,
    pub draw_weight: u32,
}

/// Declared order is the draw iteration order. Weights sum to 100.
pub const PRIZE_POOL: [Prize; 5] = [
    Prize { id: "rocket", display_name: "Rocket", rarity_tier: 5, draw_weight: 5 },
    Prize { id: "t-rex", display_name: "T-Rex", rarity_tier: 4, draw_weight: 15 },
    Prize { id: "lion", display_name: "Lion", rarity_tier: 3, draw_weight: 25 },
    Prize { id: "police-car", display_name: "Police Car", rarity_tier: 2, draw_weight: 30 },
    Prize { id: "fire-truck", display_name: "Fire Truck", rarity_tier: 1, draw_weight: 25 },
];

pub fn prize_by_id(id: &str) -> Option<&'static Prize> {
    PRIZE_POOL.iter().find(|p| p.id == id)
}

/// Cumulative-weight selection in pool order: draw `r` in `[0, total)`,
/// subtract weights until `r` falls under the current entry.
pub fn draw_prize<R: Rng>(rng: &mut R) -> &'static Prize {
    let total: u32 = PRIZE_POOL.iter().map(|p| p.draw_weight).sum();
    let mut r = rng.gen_range(0..total);
    for prize in &PRIZE_POOL {
        if r < prize.draw_weight {
            return prize;
        }
        r -= prize.draw_weight;
    }
    // Unreachable while every weight is positive; keep the walk total.
    &PRIZE_POOL[PRIZE_POOL.len() - 1]
}

/// Persisted draw history. Wire form `{ "collection": ["id", ...] }`,
/// most-recent-first, at most [`COLLECTION_CAP`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shelf {
    #[serde(default)]
    pub collection: Vec<String>,
}

impl Shelf {
    pub fn record(&mut self, prize_id: &str) {
        self.collection.insert(0, prize_id.to_string());
        self.collection.truncate(COLLECTION_CAP);
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

// =============================================================================
// Draw state machine
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing,
    Resolved { prize_id: &'static str },
}

impl DrawState {
    pub fn phase(&self) -> &'static str {
        match self {
            DrawState::Idle => "idle",
            DrawState::Drawing => "drawing",
            DrawState::Resolved { .. } => "resolved",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionError {
    pub msg: String,
}

#[derive(Debug, Default)]
pub struct DrawMachine {
    state: DrawState,
}

impl DrawMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    /// Arms the machine (`Idle → Drawing`). Returns false and changes
    /// nothing when a draw is already in flight or awaiting acknowledgment.
    pub fn trigger(&mut self) -> bool {
        match self.state {
            DrawState::Idle => {
                self.state = DrawState::Drawing;
                true
            }
            _ => false,
        }
    }

    /// `Drawing → Resolved`: picks the winner and holds it for display.
    pub fn resolve<R: Rng>(&mut self, rng: &mut R) -> Result<&'static Prize, TransitionError> {
        match self.state {
            DrawState::Drawing => {
                let prize = draw_prize(rng);
                self.state = DrawState::Resolved { prize_id: prize.id };
                Ok(prize)
            }
            ref other => Err(TransitionError {
                msg: format!("cannot resolve a draw from the {} phase", other.phase()),
            }),
        }
    }

    /// `Resolved → Idle`. Acknowledging an idle machine is a no-op;
    /// acknowledging mid-draw is rejected.
    pub fn acknowledge(&mut self) -> Result<(), TransitionError> {
        match self.state {
            DrawState::Resolved { .. } => {
                self.state = DrawState::Idle;
                Ok(())
            }
            DrawState::Idle => Ok(()),
            DrawState::Drawing => Err(TransitionError {
                msg: "draw still resolving".to_string(),
            }),
        }
    }
}
