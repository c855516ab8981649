use std::{
    fmt::{self, Display},
    str::FromStr,
};

use num_integer::Integer;
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub, Zero};

use crate::{Result, RfieldErr};

/// An exact fraction, always kept in lowest terms with a positive denominator.
///
/// Neither part is ever `i64::MIN`, so sign normalization and reciprocals cannot overflow.
/// Every arithmetic operation is checked and fails with `Overflow` instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(Ratio<i64>);

impl Rational {
    pub const ZERO: Self = Self::from_integer(0);
    pub const ONE: Self = Self::from_integer(1);

    /// Creates a new reduced `Rational`.
    ///
    /// # Arguments
    /// * `num` - The numerator.
    /// * `den` - The denominator, must not be zero.
    ///
    /// # Returns
    /// The reduced fraction, `DivisionByZero` if `den` is zero or `Overflow` if either part
    /// is `i64::MIN`.
    pub fn new(num: i64, den: i64) -> Result<Self> {
        if den == 0 {
            return Err(RfieldErr::DivisionByZero);
        }

        if num == i64::MIN || den == i64::MIN {
            return Err(RfieldErr::Overflow { layer: None });
        }

        Ok(Self(Ratio::new(num, den)))
    }

    /// Creates a whole-number `Rational`. `n` must not be `i64::MIN`, use `new` for
    /// unchecked input.
    pub const fn from_integer(n: i64) -> Self {
        Self(Ratio::new_raw(n, 1))
    }

    fn checked(ratio: Option<Ratio<i64>>) -> Result<Self> {
        match ratio {
            Some(r) if *r.numer() != i64::MIN => Ok(Self(r)),
            _ => Err(RfieldErr::Overflow { layer: None }),
        }
    }

    pub fn numer(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denom(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.numer() > 0
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// Returns the whole number this fraction represents.
    ///
    /// # Returns
    /// The integer value or `NonIntegral` if the denominator is not 1.
    pub fn to_integer(&self) -> Result<i64> {
        if !self.is_integer() {
            return Err(RfieldErr::NonIntegral { value: *self });
        }

        Ok(self.0.to_integer())
    }

    /// Returns `1 / self`, or `DivisionByZero` for the zero fraction.
    pub fn recip(&self) -> Result<Self> {
        if self.is_zero() {
            return Err(RfieldErr::DivisionByZero);
        }

        Ok(Self(self.0.recip()))
    }

    pub fn checked_add(&self, rhs: Self) -> Result<Self> {
        Self::checked(self.0.checked_add(&rhs.0))
    }

    pub fn checked_sub(&self, rhs: Self) -> Result<Self> {
        Self::checked(self.0.checked_sub(&rhs.0))
    }

    pub fn checked_mul(&self, rhs: Self) -> Result<Self> {
        Self::checked(self.0.checked_mul(&rhs.0))
    }

    /// Divides `self` by `rhs`.
    ///
    /// # Returns
    /// The reduced quotient, `DivisionByZero` if `rhs` is zero or `Overflow`.
    pub fn checked_div(&self, rhs: Self) -> Result<Self> {
        self.checked_mul(rhs.recip()?)
    }

    /// Like `checked_div`, but only succeeds when the quotient is a whole number.
    pub fn div_exact(&self, rhs: Self) -> Result<i64> {
        self.checked_div(rhs)?.to_integer()
    }

    /// Rounds towards negative infinity.
    pub fn floor(&self) -> i64 {
        Integer::div_floor(self.0.numer(), self.0.denom())
    }

    /// Rounds towards positive infinity.
    pub fn ceil(&self) -> i64 {
        -Integer::div_floor(&-self.numer(), self.0.denom())
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Parses `"n"`, `"p/q"` or a plain decimal such as `"1.25"` exactly.
impl FromStr for Rational {
    type Err = RfieldErr;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let malformed = || RfieldErr::MalformedChain(format!("cannot parse '{s}' as a fraction"));
        let int = |digits: &str| digits.trim().parse::<i64>().map_err(|_| malformed());

        if let Some((num, den)) = s.split_once('/') {
            return Self::new(int(num)?, int(den)?).map_err(|e| match e {
                RfieldErr::Overflow { .. } => malformed(),
                e => e,
            });
        }

        let Some((whole, frac)) = s.split_once('.') else {
            return Self::new(int(s)?, 1).map_err(|_| malformed());
        };

        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let negative = whole.starts_with('-');
        let whole = match whole.trim_start_matches(['-', '+']) {
            "" => 0,
            digits => int(digits)?,
        };
        let exp = u32::try_from(frac.len()).map_err(|_| malformed())?;
        let den = 10_i64.checked_pow(exp).ok_or_else(malformed)?;

        let value = Self::new(whole, 1)
            .and_then(|w| w.checked_add(Self::new(int(frac)?, den)?))
            .map_err(|_| malformed())?;

        if negative {
            Self::ZERO.checked_sub(value).map_err(|_| malformed())
        } else {
            Ok(value)
        }
    }
}
