//! Regular deck construction and shuffling

use rand::seq::SliceRandom;
use rand::Rng;

use super::card::{Card, CardColor, Rank};

/// The forty regular cards, one per colour and rank. Wild cards are placed
/// separately on secret spawn points.
#[derive(Debug, Clone)]
pub struct Deck {
    regular: Vec<Card>,
}

impl Deck {
    pub fn regular() -> Self {
        let regular = CardColor::ALL
            .iter()
            .flat_map(|&color| Rank::all().map(move |rank| Card::regular(color, rank)))
            .collect();
        Self { regular }
    }

    pub fn cards(&self) -> &[Card] {
        &self.regular
    }

    pub fn len(&self) -> usize {
        self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_empty()
    }

    /// Uniform shuffle of the regular names
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Card> {
        let mut cards = self.regular.clone();
        cards.shuffle(rng);
        cards
    }

    /// One card per spawn point: the shuffled deck repeated to cover every
    /// point, then truncated
    pub fn deal<R: Rng + ?Sized>(&self, spawn_points: usize, rng: &mut R) -> Vec<Card> {
        let shuffled = self.shuffled(rng);
        if shuffled.is_empty() {
            return Vec::new();
        }
        shuffled.iter().copied().cycle().take(spawn_points).collect()
    }
}
