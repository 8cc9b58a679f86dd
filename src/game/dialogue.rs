//! What the opponent says

use rand::seq::SliceRandom;
use rand::Rng;

pub const GREETING: &str =
    "Hey, traveller! You like candies? No? Doesn't matter. One card party with me, please!";

pub const SEARCHING: &str = "Too be doo be dooo, now where did I leave the keys for the gate...";

pub const FAREWELL: &str = "Found them! Come in!";

/// Small talk on the opponent's later turns
pub const CHATTER: &[&str] = &[
    "I'm a very, very old dragon.",
    "What a sunny day! Say cheese!",
    "When I was young... I was young.",
    "Please, don't cheat! Win fair and square and I will open the gate.",
    "Dragons exist! I am a statue of stone and paint, and I prove it.",
    "The buddha statue speaks in riddles and may help you with the game.",
    "There is a lantern around here... it does magic.",
    "I know, I know... there is a hole to the other side. What? Nothing.",
    "I made hundreds of mistakes. That is how I became a wise dragon.",
    "I shuffle cards better than I shuffle fates.",
];

pub fn random_chatter<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CHATTER.choose(rng).copied().unwrap_or(GREETING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn chatter_comes_from_the_list() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(CHATTER.contains(&random_chatter(&mut rng)));
        }
    }
}
