/// Least-significant decimal digit.
pub fn last_digit(value: u64) -> u8 {
    (value % 10) as u8
}

/// Zero-padded decimal digits of `value`, most significant first.
/// Only the lowest `width` digits are kept.
pub fn split_digits(value: u64, width: usize) -> Vec<u8> {
    let mut digits = vec![0u8; width];
    let mut rest = value;
    for slot in digits.iter_mut().rev() {
        *slot = (rest % 10) as u8;
        rest /= 10;
    }
    digits
}

/// Digit at `position` (0 = most significant) of the zero-padded number.
pub fn digit_at(value: u64, width: usize, position: usize) -> u8 {
    let shift = width - 1 - position;
    ((value / 10u64.pow(shift as u32)) % 10) as u8
}

pub fn join_digits(digits: &[u8]) -> u64 {
    digits.iter().fold(0u64, |acc, &d| acc * 10 + d as u64)
}
