use crate::domain::model::{supported_currency, Overlay};
use std::fmt;

/// `1234.5` → `1,234.50` (en-US grouping, two decimals).
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, fraction)
}

pub fn format_money(symbol: &str, value: f64) -> String {
    let amount = format_amount(value);
    match amount.strip_prefix('-') {
        Some(rest) => format!("-{}{}", symbol, rest),
        None => format!("{}{}", symbol, amount),
    }
}

/// Currency-style formatting; unknown codes are prefixed with the code.
pub fn format_currency(code: &str, value: f64) -> String {
    match supported_currency(code) {
        Some(currency) => format_money(currency.symbol, value),
        None => format!("{} {}", code, format_amount(value)),
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overlay::Conversion { symbol, amount } => {
                write!(f, "≈{} (live rate)", format_money(symbol, *amount))
            }
            Overlay::Breakdown { symbol, breakdown } => {
                writeln!(f, "Product:  {}", format_money(symbol, breakdown.base))?;
                writeln!(f, "Shipping: {}", format_money(symbol, breakdown.shipping))?;
                writeln!(f, "VAT:      {}", format_money(symbol, breakdown.vat))?;
                write!(f, "Total:    {}", format_money(symbol, breakdown.total))
            }
        }
    }
}
