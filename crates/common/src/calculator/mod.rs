//! Loan calculator
//!
//! French (annuity) amortization: a constant installment made of a
//! shrinking interest part and a growing principal part. Money amounts
//! are rounded to cents; the last installment settles the remaining
//! balance so the schedule always ends at zero.

use crate::errors::{AppError, Result};
use crate::rates::validate::check_rate;
use serde::{Deserialize, Serialize};

/// Longest term the calculator will schedule
pub const MAX_TERM_MONTHS: u32 = 120;

/// Inputs of a loan simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanRequest {
    pub vehicle_price: f64,
    pub down_payment: f64,
    pub term_months: u32,
    /// Annual rate as a fraction
    pub annual_rate: f64,
}

/// One row of the amortization schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub number: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    /// Balance left after this installment
    pub balance: f64,
}

/// Result of a loan simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanQuote {
    pub principal: f64,
    pub annual_rate: f64,
    pub monthly_rate: f64,
    pub term_months: u32,
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub schedule: Vec<Installment>,
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

impl LoanRequest {
    fn validate(&self) -> Result<()> {
        if !(self.vehicle_price.is_finite() && self.vehicle_price > 0.0) {
            return Err(AppError::validation("vehiclePrice", "vehiclePrice must be positive"));
        }
        if !(self.down_payment.is_finite() && self.down_payment >= 0.0) {
            return Err(AppError::validation("downPayment", "downPayment must not be negative"));
        }
        if self.down_payment >= self.vehicle_price {
            return Err(AppError::validation(
                "downPayment",
                "downPayment must be lower than vehiclePrice",
            ));
        }
        if self.term_months == 0 || self.term_months > MAX_TERM_MONTHS {
            return Err(AppError::validation(
                "termMonths",
                format!("termMonths must be between 1 and {}", MAX_TERM_MONTHS),
            ));
        }
        check_rate("annualRate", self.annual_rate)
    }

    pub fn principal(&self) -> f64 {
        cents(self.vehicle_price - self.down_payment)
    }
}

/// Fixed monthly installment for `principal` over `term_months` at `monthly_rate`
pub fn monthly_payment(principal: f64, monthly_rate: f64, term_months: u32) -> f64 {
    if monthly_rate == 0.0 {
        return principal / f64::from(term_months);
    }
    let discount = 1.0 - (1.0 + monthly_rate).powi(-(term_months as i32));
    principal * monthly_rate / discount
}

/// Price a loan and build its amortization schedule
pub fn quote(request: &LoanRequest) -> Result<LoanQuote> {
    request.validate()?;

    let principal = request.principal();
    let monthly_rate = request.annual_rate / 12.0;
    let payment = cents(monthly_payment(principal, monthly_rate, request.term_months));

    let mut schedule = Vec::with_capacity(request.term_months as usize);
    let mut balance = principal;

    for number in 1..=request.term_months {
        let interest = cents(balance * monthly_rate);
        let principal_part = if number == request.term_months {
            balance
        } else {
            cents(payment - interest).min(balance)
        };

        balance = cents(balance - principal_part);
        schedule.push(Installment {
            number,
            payment: cents(principal_part + interest),
            principal: principal_part,
            interest,
            balance,
        });
    }

    let total_payment = cents(schedule.iter().map(|i| i.payment).sum());

    Ok(LoanQuote {
        principal,
        annual_rate: request.annual_rate,
        monthly_rate,
        term_months: request.term_months,
        monthly_payment: payment,
        total_payment,
        total_interest: cents(total_payment - principal),
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(term_months: u32, annual_rate: f64) -> LoanRequest {
        LoanRequest {
            vehicle_price: 12_000.0,
            down_payment: 2_000.0,
            term_months,
            annual_rate,
        }
    }

    #[test]
    fn test_monthly_payment_formula() {
        // 10_000 at 1% a month over 12 months
        let payment = monthly_payment(10_000.0, 0.01, 12);
        assert!((payment - 888.4879).abs() < 1e-3);
        assert_eq!(monthly_payment(1_200.0, 0.0, 12), 100.0);
    }

    #[test]
    fn test_quote_schedule_ends_at_zero() {
        let quote = quote(&request(12, 0.12)).unwrap();

        assert_eq!(quote.principal, 10_000.0);
        assert_eq!(quote.monthly_payment, 888.49);
        assert_eq!(quote.schedule.len(), 12);
        assert_eq!(quote.schedule.last().unwrap().balance, 0.0);
        assert_eq!(quote.schedule[0].interest, 100.0);

        let repaid: f64 = quote.schedule.iter().map(|i| i.principal).sum();
        assert!((repaid - quote.principal).abs() < 1e-6);
        assert!(quote.total_interest > 600.0 && quote.total_interest < 700.0);
    }

    #[test]
    fn test_higher_rate_costs_more() {
        let cheap = quote(&request(24, 0.30)).unwrap();
        let dear = quote(&request(24, 0.45)).unwrap();
        assert!(dear.monthly_payment > cheap.monthly_payment);
        assert!(dear.total_interest > cheap.total_interest);
    }

    #[test]
    fn test_invalid_requests() {
        let mut bad = request(12, 0.45);
        bad.down_payment = 12_000.0;
        assert!(quote(&bad).is_err());

        assert!(quote(&request(0, 0.45)).is_err());
        assert!(quote(&request(12, 0.0)).is_err());
        assert!(quote(&request(12, 1.2)).is_err());
    }
}
