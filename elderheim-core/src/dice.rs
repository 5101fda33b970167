//! Dice rolls for the adventure.

use rand::Rng;

/// Roll a twenty-sided die.
pub fn roll_d20() -> u32 {
    rand::thread_rng().gen_range(1..=20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_d20_stays_in_range() {
        for _ in 0..1000 {
            let roll = roll_d20();
            assert!((1..=20).contains(&roll));
        }
    }
}
