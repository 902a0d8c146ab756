use rand::Rng;

use crate::roller::Roller;

/// A bonus die such as `1d6`.
///
/// Rule tables write bonuses as `"<count>d<sides>"`, but only the sides are
/// read: a bonus is always a single die. Anything without a positive side
/// count after the `d` is [`DiceExpr::NoBonus`], which rolls to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceExpr {
    Roll { sides: u32 },
    NoBonus,
}

impl DiceExpr {
    /// Parse an optional expression. Never fails.
    ///
    /// Whatever precedes the first `d` is ignored, and only the leading
    /// digits after it are read, so `3d6`, `0d6` and `1d6+2` all mean one d6.
    pub fn parse(expr: Option<&str>) -> Self {
        let Some(expr) = expr else {
            return DiceExpr::NoBonus;
        };
        let Some((_, sides_part)) = expr.split_once('d') else {
            return DiceExpr::NoBonus;
        };

        match leading_digits(sides_part).parse::<u32>() {
            Ok(sides) if sides > 0 => DiceExpr::Roll { sides },
            _ => DiceExpr::NoBonus,
        }
    }

    pub fn roll<R: Rng>(&self, roller: &mut Roller<R>) -> u32 {
        match *self {
            DiceExpr::Roll { sides } => roller.roll_dice(sides, 1),
            DiceExpr::NoBonus => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn max(&self) -> u32 {
        match *self {
            DiceExpr::Roll { sides } => sides,
            DiceExpr::NoBonus => 0,
        }
    }
}

fn leading_digits(s: &str) -> &str {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::DiceExpr;
    use crate::roller::Roller;

    #[test]
    fn parses_single_die() {
        assert_eq!(DiceExpr::parse(Some("1d6")), DiceExpr::Roll { sides: 6 });
        assert_eq!(DiceExpr::parse(Some(" 1d4 ")), DiceExpr::Roll { sides: 4 });
        assert_eq!(DiceExpr::parse(Some("d8")), DiceExpr::Roll { sides: 8 });
    }

    #[test]
    fn count_is_ignored() {
        assert_eq!(DiceExpr::parse(Some("3d6")), DiceExpr::Roll { sides: 6 });
        assert_eq!(DiceExpr::parse(Some("0d6")), DiceExpr::Roll { sides: 6 });
        assert_eq!(
            DiceExpr::parse(Some("4000000000d6")),
            DiceExpr::Roll { sides: 6 }
        );
    }

    #[test]
    fn trailing_text_is_ignored() {
        assert_eq!(DiceExpr::parse(Some("1d6+2")), DiceExpr::Roll { sides: 6 });
    }

    #[test]
    fn malformed_expressions_give_no_bonus() {
        for expr in ["", "3", "none", "1d", "1dX", "1d0", "d", "1D6", "1d-4"] {
            assert_eq!(DiceExpr::parse(Some(expr)), DiceExpr::NoBonus, "{expr:?}");
        }
        assert_eq!(DiceExpr::parse(None), DiceExpr::NoBonus);
    }

    #[test]
    fn no_bonus_rolls_zero() {
        let mut roller = Roller::from_seed(5);
        assert_eq!(DiceExpr::NoBonus.roll(&mut roller), 0);
    }

    #[test]
    fn multi_die_text_rolls_one_die() {
        let mut roller = Roller::from_seed(8);
        let expr = DiceExpr::parse(Some("3d6"));
        let mut highest = 0;
        for _ in 0..500 {
            let value = expr.roll(&mut roller);
            assert!((1..=6).contains(&value), "3d6 bonus rolled {value}");
            highest = highest.max(value);
        }
        assert_eq!(highest, 6);
    }

    #[test]
    fn roll_stays_within_expression() {
        let mut roller = Roller::from_seed(8);
        let expr = DiceExpr::parse(Some("1d4"));
        for _ in 0..200 {
            let value = expr.roll(&mut roller);
            assert!((1..=expr.max()).contains(&value));
        }
    }
}
