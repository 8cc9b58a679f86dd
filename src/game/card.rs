//! Card identities and their canonical names

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Yellow,
    Red,
    Blue,
    Green,
}

impl CardColor {
    pub const ALL: [CardColor; 4] = [Self::Yellow, Self::Red, Self::Blue, Self::Green];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

/// Card number, always within 0..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rank(u8);

impl Rank {
    pub const MAX: u8 = 9;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Rank> {
        (0..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for Rank {
    type Error = RankOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(RankOutOfRange(value))
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> u8 {
        rank.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Card {
    Regular { color: CardColor, rank: Rank },
    Wild,
}

impl Card {
    pub fn regular(color: CardColor, rank: Rank) -> Self {
        Self::Regular { color, rank }
    }

    pub fn is_wild(&self) -> bool {
        matches!(self, Self::Wild)
    }

    pub fn color(&self) -> Option<CardColor> {
        match self {
            Self::Regular { color, .. } => Some(*color),
            Self::Wild => None,
        }
    }

    pub fn rank(&self) -> Option<Rank> {
        match self {
            Self::Regular { rank, .. } => Some(*rank),
            Self::Wild => None,
        }
    }

    /// Canonical template name, `card_<color>_<rank>` or `card_wild`
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Name of the `n`th spawned copy
    pub fn instance_name(&self, n: u64) -> String {
        format!("{self}_clone_{n}")
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular { color, rank } => write!(f, "card_{}_{}", color.as_str(), rank.0),
            Self::Wild => f.write_str("card_wild"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("card rank {0} is out of range")]
pub struct RankOutOfRange(pub u8);

/// A card spawned into the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardInstance {
    pub entity: EntityId,
    pub card: Card,
    /// Set once the card sits on a slot or the shrine
    pub attached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let card = Card::regular(CardColor::Blue, Rank::new(7).unwrap());
        assert_eq!(card.name(), "card_blue_7");
        assert_eq!(card.instance_name(12), "card_blue_7_clone_12");
        assert_eq!(Card::Wild.instance_name(0), "card_wild_clone_0");
    }

    #[test]
    fn ranks_deserialize_within_bounds() {
        let card: Card =
            serde_json::from_str(r#"{"kind":"regular","color":"red","rank":9}"#).unwrap();
        assert_eq!(card, Card::regular(CardColor::Red, Rank::new(9).unwrap()));
        assert!(serde_json::from_str::<Card>(r#"{"kind":"regular","color":"red","rank":10}"#).is_err());
    }

    #[test]
    fn rank_bounds() {
        assert!(Rank::new(9).is_some());
        assert!(Rank::new(10).is_none());
        assert_eq!(Rank::all().count(), 10);
    }

    #[test]
    fn wild_has_no_color_or_rank() {
        assert_eq!(Card::Wild.color(), None);
        assert_eq!(Card::Wild.rank(), None);
    }
}
