//! End-of-session match summary

use serde::Serialize;
use uuid::Uuid;

use super::engine::{MatchPhase, Side};

/// A card committed to a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub slot: u32,
    pub side: Side,
    pub card: String,
}

/// Serializable outcome of a session, logged by the host
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub seed: u64,
    pub phase: MatchPhase,
    pub turn: u32,
    pub max_turns: u32,
    pub ended: bool,
    pub moves: Vec<MoveRecord>,
    /// Card instances spawned over the session
    pub cards_in_play: usize,
    pub shrine_completed: bool,
    pub ticks: u64,
    pub sim_seconds: f32,
}

impl MatchSummary {
    pub fn player_moves(&self) -> usize {
        self.moves.iter().filter(|m| m.side == Side::Player).count()
    }

    pub fn opponent_moves(&self) -> usize {
        self.moves.iter().filter(|m| m.side == Side::Opponent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_moves_in_order() {
        let summary = MatchSummary {
            match_id: Uuid::nil(),
            seed: 7,
            phase: MatchPhase::Ended,
            turn: 2,
            max_turns: 2,
            ended: true,
            moves: vec![
                MoveRecord {
                    slot: 1,
                    side: Side::Opponent,
                    card: "card_red_3".to_string(),
                },
                MoveRecord {
                    slot: 2,
                    side: Side::Player,
                    card: "card_red_9".to_string(),
                },
            ],
            cards_in_play: 42,
            shrine_completed: false,
            ticks: 600,
            sim_seconds: 10.0,
        };
        assert_eq!(summary.player_moves(), 1);
        assert_eq!(summary.opponent_moves(), 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["phase"], "ended");
        assert_eq!(json["moves"][0]["side"], "opponent");
        assert_eq!(json["moves"][1]["card"], "card_red_9");
    }
}
