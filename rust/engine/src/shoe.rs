//! Multi-deck shoe with warm-up tracking and reshuffle detection.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::cards::{full_shoe, Card, DECK_SIZE};
use crate::outcome::Outcome;

pub const DEFAULT_DECKS: usize = 8;
pub const DEFAULT_WARMUP: usize = 15;
pub const DEFAULT_CARDS_PER_ROUND: usize = 3;
pub const TIE_PROBABILITY: f64 = 0.096;
/// Rounds [`Shoe::undo_last_result`] can reverse; older steps are dropped.
pub const MAX_UNDO_STEPS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoeSettings {
    pub deck_count: usize,
    pub warmup_size: usize,
    pub auto_detect: bool,
    /// Cards assumed consumed by a round reported without card values.
    pub cards_per_round: usize,
    /// Rounds after which an auto-detecting shoe is replaced.
    pub max_rounds: Option<usize>,
    pub warmup_after_reshuffle: bool,
    /// Shuffle seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for ShoeSettings {
    fn default() -> Self {
        Self {
            deck_count: DEFAULT_DECKS,
            warmup_size: DEFAULT_WARMUP,
            auto_detect: true,
            cards_per_round: DEFAULT_CARDS_PER_ROUND,
            max_rounds: None,
            warmup_after_reshuffle: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShoeStatus {
    Warmup,
    Active,
    Exhausted,
    /// Replaced by a new shoe and no round dealt from it yet.
    Reshuffled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoeCounts {
    pub rounds: usize,
    pub banker: usize,
    pub player: usize,
    pub tie: usize,
}

impl ShoeCounts {
    fn tally(&mut self, outcome: Outcome) {
        self.rounds += 1;
        match outcome {
            Outcome::Banker => self.banker += 1,
            Outcome::Player => self.player += 1,
            Outcome::Tie => self.tie += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShoeOdds {
    pub banker: f64,
    pub player: f64,
    pub tie: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoeSnapshot {
    pub shoe_id: u64,
    pub status: ShoeStatus,
    pub deck_count: usize,
    pub cards_remaining: usize,
    pub cards_used: usize,
    pub rounds_in_shoe: usize,
    pub is_in_warmup: bool,
    pub warmup_progress: usize,
    pub warmup_size: usize,
    pub auto_detect: bool,
    pub statistics: ShoeCounts,
    pub odds: ShoeOdds,
}

/// Scalar part of the shoe state, cheap to save per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    used: usize,
    counts: ShoeCounts,
    warmup_progress: usize,
    exhausted: bool,
    reshuffled: bool,
}

impl Counters {
    fn fresh(warmup_progress: usize, reshuffled: bool) -> Self {
        Self {
            used: 0,
            counts: ShoeCounts::default(),
            warmup_progress,
            exhausted: false,
            reshuffled,
        }
    }
}

/// Everything an automatic reshuffle overwrites.
#[derive(Debug, Clone)]
struct Replaced {
    id: u64,
    cards: Vec<Card>,
    counters: Counters,
    rng: ChaCha20Rng,
}

#[derive(Debug, Clone)]
struct Step {
    /// Cards taken this round with the index each occupied.
    removed: Vec<(usize, Card)>,
    before: Counters,
    replaced: Option<Box<Replaced>>,
}

#[derive(Debug)]
pub struct Shoe {
    settings: ShoeSettings,
    id: u64,
    cards: Vec<Card>,
    counters: Counters,
    rng: ChaCha20Rng,
    steps: VecDeque<Step>,
}

impl Shoe {
    pub fn new(settings: ShoeSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut shoe = Self {
            id: 0,
            cards: Vec::new(),
            counters: Counters::fresh(0, false),
            rng: ChaCha20Rng::seed_from_u64(seed),
            steps: VecDeque::new(),
            settings,
        };
        shoe.open_next(true, false);
        shoe
    }

    pub fn settings(&self) -> &ShoeSettings {
        &self.settings
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn total_cards(&self) -> usize {
        DECK_SIZE * self.settings.deck_count
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn used(&self) -> usize {
        self.counters.used
    }

    pub fn rounds(&self) -> usize {
        self.counters.counts.rounds
    }

    pub fn warmup_progress(&self) -> usize {
        self.counters.warmup_progress
    }

    pub fn is_in_warmup_period(&self) -> bool {
        self.counters.warmup_progress < self.settings.warmup_size
    }

    pub fn can_undo(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn status(&self) -> ShoeStatus {
        if self.counters.exhausted {
            ShoeStatus::Exhausted
        } else if self.counters.reshuffled {
            ShoeStatus::Reshuffled
        } else if self.is_in_warmup_period() {
            ShoeStatus::Warmup
        } else {
            ShoeStatus::Active
        }
    }

    /// Composition-based odds: a shoe rich in low cards favours the banker.
    pub fn odds(&self) -> ShoeOdds {
        let total = self.cards.len();
        let banker = if total == 0 {
            0.5
        } else {
            let high = self.cards.iter().filter(|c| c.rank.is_high()).count() as f64;
            let low = self.cards.iter().filter(|c| c.rank.is_low()).count() as f64;
            (0.5 + (low - high) / (2.0 * total as f64)).clamp(0.4, 0.6)
        };
        ShoeOdds {
            banker,
            player: 1.0 - banker - TIE_PROBABILITY,
            tie: TIE_PROBABILITY,
        }
    }

    pub fn snapshot(&self) -> ShoeSnapshot {
        ShoeSnapshot {
            shoe_id: self.id,
            status: self.status(),
            deck_count: self.settings.deck_count,
            cards_remaining: self.remaining(),
            cards_used: self.used(),
            rounds_in_shoe: self.rounds(),
            is_in_warmup: self.is_in_warmup_period(),
            warmup_progress: self.counters.warmup_progress,
            warmup_size: self.settings.warmup_size,
            auto_detect: self.settings.auto_detect,
            statistics: self.counters.counts,
            odds: self.odds(),
        }
    }

    /// Account for one round. `cards` are the point values dealt, when known.
    ///
    /// Returns `true` when this round exhausted the shoe and a new one was
    /// opened automatically.
    pub fn add_result(&mut self, outcome: Outcome, cards: Option<&[u8]>) -> bool {
        let before = self.counters;
        let removed = match cards {
            Some(values) if !values.is_empty() => self.take_values(values),
            _ => self.take_top(self.settings.cards_per_round),
        };

        self.counters.used += removed.len();
        self.counters.counts.tally(outcome);
        self.counters.reshuffled = false;
        if self.is_in_warmup_period() {
            self.counters.warmup_progress += 1;
        }

        let limit_reached = self
            .settings
            .max_rounds
            .is_some_and(|max| self.counters.counts.rounds >= max);
        let exhausted = self.cards.is_empty() || limit_reached;

        tracing::debug!(
            shoe_id = self.id,
            outcome = %outcome,
            taken = removed.len(),
            remaining = self.cards.len(),
            "round accounted"
        );

        let mut replaced = None;
        if exhausted && self.settings.auto_detect {
            replaced = Some(Box::new(Replaced {
                id: self.id,
                cards: self.cards.clone(),
                counters: self.counters,
                rng: self.rng.clone(),
            }));
            let warmup = self.settings.warmup_after_reshuffle;
            self.open_next(warmup, true);
            tracing::info!(shoe_id = self.id, "shoe exhausted, reshuffled");
        } else if exhausted {
            self.counters.exhausted = true;
        }

        let reshuffled = replaced.is_some();
        if self.steps.len() == MAX_UNDO_STEPS {
            self.steps.pop_front();
        }
        self.steps.push_back(Step {
            removed,
            before,
            replaced,
        });
        reshuffled
    }

    /// Reverse the most recent [`Shoe::add_result`]. Returns `false` when
    /// there is nothing to reverse.
    pub fn undo_last_result(&mut self) -> bool {
        let Some(step) = self.steps.pop_back() else {
            return false;
        };
        if let Some(replaced) = step.replaced {
            let Replaced {
                id,
                cards,
                counters,
                rng,
            } = *replaced;
            self.id = id;
            self.cards = cards;
            self.counters = counters;
            self.rng = rng;
        }
        for (index, card) in step.removed.into_iter().rev() {
            self.cards.insert(index, card);
        }
        self.counters = step.before;
        self.counters.warmup_progress = self
            .counters
            .warmup_progress
            .min(self.settings.warmup_size);
        tracing::debug!(shoe_id = self.id, remaining = self.cards.len(), "round undone");
        true
    }

    /// Open a new shoe under the next id.
    pub fn start_new_shoe(&mut self) -> u64 {
        self.open_next(true, false);
        self.steps.clear();
        tracing::info!(shoe_id = self.id, "new shoe started");
        self.id
    }

    /// Fresh cards and zeroed counters under the same id.
    pub fn reset_current_shoe(&mut self) -> u64 {
        self.refill();
        self.counters = Counters::fresh(0, false);
        self.steps.clear();
        tracing::info!(shoe_id = self.id, "shoe reset");
        self.id
    }

    /// Drop the current shoe and its undo history, opening the next id.
    pub fn reset_all(&mut self) -> u64 {
        self.start_new_shoe()
    }

    pub fn update_settings(&mut self, auto_detect: bool, warmup_size: usize) {
        self.settings.auto_detect = auto_detect;
        self.settings.warmup_size = warmup_size;
        self.counters.warmup_progress = self.counters.warmup_progress.min(warmup_size);
        tracing::info!(auto_detect, warmup_size, "shoe settings updated");
    }

    fn open_next(&mut self, warmup: bool, reshuffled: bool) {
        self.id += 1;
        self.refill();
        let progress = if warmup { 0 } else { self.settings.warmup_size };
        self.counters = Counters::fresh(progress, reshuffled);
    }

    fn refill(&mut self) {
        self.cards = full_shoe(self.settings.deck_count);
        self.cards.shuffle(&mut self.rng);
    }

    // the end of `cards` is the top of the shoe
    fn take_top(&mut self, n: usize) -> Vec<(usize, Card)> {
        let mut removed = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(card) = self.cards.pop() else {
                break;
            };
            removed.push((self.cards.len(), card));
        }
        removed
    }

    fn take_values(&mut self, values: &[u8]) -> Vec<(usize, Card)> {
        let mut removed = Vec::with_capacity(values.len());
        for &value in values {
            let position = self.cards.iter().rposition(|c| c.value() == value);
            let index = match position {
                Some(index) => index,
                None if !self.cards.is_empty() => self.cards.len() - 1,
                None => break,
            };
            let card = self.cards.remove(index);
            removed.push((index, card));
        }
        removed
    }
}

impl Default for Shoe {
    fn default() -> Self {
        Self::new(ShoeSettings::default())
    }
}
