//! Annuity schedule computation.
//!
//! Pure function of principal, rate and term. All arithmetic is exact
//! `Decimal`; each published figure is rounded to currency precision once,
//! and the final entry absorbs the accumulated rounding residual so the
//! principal portions sum to the principal to the cent.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;

use ferrobank_core::{DomainError, DomainResult, Money};

/// One month of an amortization schedule: a fixed installment split into
/// its principal and interest portions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleLine {
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
}

/// Compute the full annuity schedule for a loan.
///
/// Month `i` (1-based) is due at `start_date + i` months. With monthly rate
/// `r = annual_rate_percent / 100 / 12` the installment is
/// `principal * r * (1+r)^term / ((1+r)^term - 1)`, or `principal / term`
/// when `r` is zero.
pub fn annuity_schedule(
    principal: Money,
    annual_rate_percent: Decimal,
    term_months: u32,
    start_date: DateTime<Utc>,
) -> DomainResult<Vec<ScheduleLine>> {
    if !principal.is_positive() {
        return Err(DomainError::validation("principal must be positive"));
    }
    if term_months == 0 {
        return Err(DomainError::validation("term must be at least one month"));
    }
    if annual_rate_percent.is_sign_negative() && !annual_rate_percent.is_zero() {
        return Err(DomainError::validation("interest rate must not be negative"));
    }

    let monthly_rate = annual_rate_percent / Decimal::from(100) / Decimal::from(12);

    let installment = if monthly_rate.is_zero() {
        Money::new(principal.as_decimal() / Decimal::from(term_months))
    } else {
        // (1 + r)^term via repeated multiplication: no floats, no special
        // math features, term is small.
        let base = Decimal::ONE + monthly_rate;
        let mut growth = Decimal::ONE;
        for _ in 0..term_months {
            growth *= base;
        }
        Money::new(principal.as_decimal() * monthly_rate * growth / (growth - Decimal::ONE))
    };
    if !installment.is_positive() {
        return Err(DomainError::validation(
            "principal too small for term: installment rounds to zero",
        ));
    }

    let mut lines = Vec::with_capacity(term_months as usize);
    let mut remaining = principal;

    for month in 1..=term_months {
        let due_date = start_date
            .checked_add_months(Months::new(month))
            .ok_or_else(|| DomainError::validation("due date beyond supported calendar range"))?;

        let interest = Money::new(remaining.as_decimal() * monthly_rate);
        let (portion, amount) = if month == term_months {
            // Residual rule: the last entry takes exactly what is left.
            (remaining, remaining + interest)
        } else {
            (installment - interest, installment)
        };
        if portion.is_negative() {
            return Err(DomainError::validation(
                "installment does not cover interest for this rate and term",
            ));
        }

        remaining -= portion;
        lines.push(ScheduleLine {
            due_date,
            amount,
            principal: portion,
            interest,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core::str::FromStr;
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn twelve_percent_over_a_year_is_exact() {
        let principal = Money::from_major(120_000);
        let lines = annuity_schedule(principal, Decimal::from(12), 12, start()).unwrap();

        assert_eq!(lines.len(), 12);
        // First month's interest is principal * (12% / 12).
        assert_eq!(lines[0].interest, Money::from_str("1200.00").unwrap());

        let total_principal = lines
            .iter()
            .fold(Money::ZERO, |sum, line| sum + line.principal);
        assert_eq!(total_principal, principal);

        // Fixed installment everywhere except the residual-bearing last entry.
        for line in &lines[..11] {
            assert_eq!(line.amount, lines[0].amount);
        }
        for line in &lines {
            assert_eq!(line.amount, line.principal + line.interest);
        }
    }

    #[test]
    fn zero_rate_splits_evenly() {
        let lines =
            annuity_schedule(Money::from_major(1000), Decimal::ZERO, 10, start()).unwrap();

        assert_eq!(lines.len(), 10);
        for line in &lines {
            assert_eq!(line.amount, Money::from_str("100.00").unwrap());
            assert_eq!(line.interest, Money::ZERO);
            assert_eq!(line.principal, line.amount);
        }
    }

    #[test]
    fn due_dates_advance_one_month_per_entry() {
        let lines =
            annuity_schedule(Money::from_major(600), Decimal::ZERO, 3, start()).unwrap();

        assert_eq!(
            lines.iter().map(|l| l.due_date).collect::<Vec<_>>(),
            vec![
                Utc.with_ymd_and_hms(2025, 2, 15, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn month_end_start_dates_clamp() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let lines = annuity_schedule(Money::from_major(300), Decimal::ZERO, 2, jan_31).unwrap();

        assert_eq!(
            lines[0].due_date,
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let principal = Money::from_major(1000);

        assert!(annuity_schedule(Money::ZERO, Decimal::from(10), 12, start()).is_err());
        assert!(annuity_schedule(Money::from_major(-1), Decimal::from(10), 12, start()).is_err());
        assert!(annuity_schedule(principal, Decimal::from(10), 0, start()).is_err());
        assert!(annuity_schedule(principal, Decimal::from(-1), 12, start()).is_err());
        // 0.01 over 60 months: the installment itself rounds to zero.
        assert!(
            annuity_schedule(Money::from_str("0.01").unwrap(), Decimal::ZERO, 60, start())
                .is_err()
        );
    }

    proptest! {
        /// Property: principal portions always sum back to the principal
        /// exactly, and every entry is internally consistent.
        #[test]
        fn principal_portions_sum_exactly(
            cents in 10_000i64..1_000_000_000i64,
            rate in 0u32..=40,
            term in 1u32..=60,
        ) {
            let principal = Money::new(Decimal::new(cents, 2));
            let lines =
                annuity_schedule(principal, Decimal::from(rate), term, start()).unwrap();

            prop_assert_eq!(lines.len(), term as usize);

            let mut total_principal = Money::ZERO;
            for line in &lines {
                prop_assert!(!line.principal.is_negative());
                prop_assert!(!line.interest.is_negative());
                prop_assert_eq!(line.amount, line.principal + line.interest);
                total_principal += line.principal;
            }
            prop_assert_eq!(total_principal, principal);
        }
    }
}
