//! Matching rule and the opponent's card preference

use super::card::Card;

/// A wild on either side matches; two regular cards match on colour or rank
pub fn is_match(candidate: &Card, previous: &Card) -> bool {
    match (candidate, previous) {
        (Card::Wild, _) | (_, Card::Wild) => true,
        (
            Card::Regular { color, rank },
            Card::Regular {
                color: prev_color,
                rank: prev_rank,
            },
        ) => color == prev_color || rank == prev_rank,
    }
}

/// Opponent reply to a regular card, from free cards in scene order:
/// same rank in another colour, then same colour with another rank, then
/// a wild. An exact duplicate of `previous` is never chosen.
pub fn opponent_reply<'a, I, T>(previous: &Card, free: I) -> Option<T>
where
    I: IntoIterator<Item = (T, &'a Card)>,
    T: Copy,
{
    let (Some(prev_color), Some(prev_rank)) = (previous.color(), previous.rank()) else {
        return None;
    };
    let free: Vec<(T, &Card)> = free.into_iter().collect();

    let same_rank = free.iter().find(|(_, c)| {
        matches!(c, Card::Regular { color, rank } if *rank == prev_rank && *color != prev_color)
    });
    let same_color = || {
        free.iter().find(|(_, c)| {
            matches!(c, Card::Regular { color, rank } if *color == prev_color && *rank != prev_rank)
        })
    };
    let wild = || free.iter().find(|(_, c)| c.is_wild());

    same_rank
        .or_else(same_color)
        .or_else(wild)
        .map(|(id, _)| *id)
}
