// Pacing fallback used while the designated adversary is still held back

use crate::types::Move;

/// Ticks at the start of a level spent moving left
pub const INITIAL_LEFT_TICKS: u32 = 5;

/// Interval at which the pacing direction flips
pub const FLIP_INTERVAL: u32 = 20;

/// Oscillating move as a pure function of the tick within the level and the last move made
///
/// LEFT for the first five ticks, RIGHT at tick five, a LEFT/RIGHT flip on every
/// multiple of twenty, otherwise the last move repeats.
pub fn pace(tick: u32, last_move: Move) -> Move {
    if tick < INITIAL_LEFT_TICKS {
        return Move::Left;
    }
    if tick == INITIAL_LEFT_TICKS {
        return Move::Right;
    }
    if tick % FLIP_INTERVAL == 0 {
        if last_move == Move::Left {
            Move::Right
        } else {
            Move::Left
        }
    } else {
        last_move
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds each pacing output back in as the next tick's last move
    fn run(ticks: u32, mut last: Move) -> Vec<Move> {
        (0..ticks)
            .map(|tick| {
                last = pace(tick, last);
                last
            })
            .collect()
    }

    #[test]
    fn test_pacing_sequence_first_26_ticks() {
        let moves = run(26, Move::Neutral);

        for tick in 0..5 {
            assert_eq!(moves[tick], Move::Left, "tick {}", tick);
        }
        assert_eq!(moves[5], Move::Right);
        for tick in 6..20 {
            assert_eq!(moves[tick], Move::Right, "tick {}", tick);
        }
        assert_eq!(moves[20], Move::Left, "flip at tick 20");
        for tick in 21..26 {
            assert_eq!(moves[tick], Move::Left, "tick {}", tick);
        }
    }

    #[test]
    fn test_flips_every_twenty_ticks() {
        let moves = run(61, Move::Neutral);
        assert_eq!(moves[39], Move::Left);
        assert_eq!(moves[40], Move::Right);
        assert_eq!(moves[59], Move::Right);
        assert_eq!(moves[60], Move::Left);
    }

    #[test]
    fn test_tick_zero_is_left_regardless_of_last_move() {
        assert_eq!(pace(0, Move::Right), Move::Left);
        assert_eq!(pace(0, Move::Neutral), Move::Left);
    }

    #[test]
    fn test_without_prior_move_repeats_neutral_between_flips() {
        // No prior move and no flip: the last move is simply repeated
        assert_eq!(pace(7, Move::Neutral), Move::Neutral);
        assert_eq!(pace(20, Move::Neutral), Move::Left);
    }
}
