use crate::error::{Result, TrainerError};
use rand::Rng;

/// Widest operand the trainer generates or accepts; ×12 of it still fits a u64.
pub const MAX_DIGITS: u32 = 15;
pub const MAX_OPERAND: u64 = 999_999_999_999_999;

/// Split a number into its decimal digits, most significant first.
pub fn number_to_digits(num: u64) -> Vec<u8> {
    if num == 0 {
        return vec![0];
    }

    let mut digits = Vec::new();
    let mut rest = num;
    while rest > 0 {
        digits.push((rest % 10) as u8);
        rest /= 10;
    }
    digits.reverse();
    digits
}

/// Fold decimal digits (most significant first) back into a number.
pub fn digits_to_number(digits: &[u8]) -> u64 {
    digits
        .iter()
        .fold(0u64, |acc, &d| acc * 10 + u64::from(d))
}

pub fn digit_count(num: u64) -> u32 {
    num.checked_ilog10().map_or(1, |log| log + 1)
}

/// Uniform integer in `min..=max`.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    rng.gen_range(min..=max)
}

/// Uniform number with exactly `digit_count` digits and no leading zero.
/// Single-digit numbers are drawn from 1..=9.
pub fn generate_number<R: Rng + ?Sized>(rng: &mut R, digit_count: u32) -> Result<u64> {
    if digit_count == 0 || digit_count > MAX_DIGITS {
        return Err(TrainerError::DigitCountOutOfRange(digit_count));
    }
    if digit_count == 1 {
        return Ok(random_int(rng, 1, 9));
    }

    let min = 10u64.pow(digit_count - 1);
    let max = 10u64.pow(digit_count) - 1;
    Ok(random_int(rng, min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_number_to_digits() {
        assert_eq!(number_to_digits(0), vec![0]);
        assert_eq!(number_to_digits(7), vec![7]);
        assert_eq!(number_to_digits(1024), vec![1, 0, 2, 4]);
    }

    #[test]
    fn test_digits_to_number() {
        assert_eq!(digits_to_number(&[3, 7, 4]), 374);
        assert_eq!(digits_to_number(&[0]), 0);
        assert_eq!(digits_to_number(&[]), 0);
    }

    #[test]
    fn test_digit_roundtrip_at_bounds() {
        assert_eq!(digits_to_number(&number_to_digits(MAX_OPERAND)), MAX_OPERAND);
        assert_eq!(number_to_digits(MAX_OPERAND).len() as u32, MAX_DIGITS);
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(230), 3);
        assert_eq!(digit_count(MAX_OPERAND), MAX_DIGITS);
    }

    #[test]
    fn test_generate_number_respects_digit_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 1..=8 {
            for _ in 0..200 {
                let n = generate_number(&mut rng, count).unwrap();
                assert_eq!(digit_count(n), count);
                assert!(n >= 1);
            }
        }
    }

    #[test]
    fn test_generate_number_rejects_bad_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_number(&mut rng, 0).is_err());
        assert!(generate_number(&mut rng, MAX_DIGITS + 1).is_err());
        assert!(generate_number(&mut rng, MAX_DIGITS).is_ok());
    }
}
