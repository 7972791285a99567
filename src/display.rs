//! Formatting of amounts and dates for display.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[month repr:short] [day padding:zero], [year]");

/// Format `number` as rupees with two decimal places and Indian digit
/// grouping, e.g. "₹1,23,456.50".
pub fn format_currency(number: f64) -> String {
    static FORMATTER: OnceLock<Formatter> = OnceLock::new();

    let formatter = FORMATTER.get_or_init(|| Formatter::new().precision(Precision::Decimals(2)));
    let digits = pad_decimals(formatter.fmt_string(number.abs()));
    let sign = if number < 0.0 && digits != "0.00" {
        "-"
    } else {
        ""
    };

    format!("{sign}₹{}", group_lakhs(&digits))
}

/// Group the whole part of `digits` the en-IN way: the last three digits,
/// then pairs, e.g. "1234567.00" becomes "12,34,567.00".
fn group_lakhs(digits: &str) -> String {
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    if whole.len() <= 3 {
        return digits.to_owned();
    }

    let (head, tail) = whole.split_at(whole.len() - 3);
    let mut grouped = String::with_capacity(digits.len() + head.len() / 2 + 1);

    for (i, digit) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped.push(',');
    grouped.push_str(tail);

    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    grouped
}

/// numfmt drops trailing zeros, so "12.30" is rendered as "12.3" and "12.00"
/// as "12". Put them back.
fn pad_decimals(mut formatted_string: String) -> String {
    match formatted_string.rfind('.') {
        None => formatted_string.push_str(".00"),
        Some(position) => {
            for _ in formatted_string.len() - position - 1..2 {
                formatted_string.push('0');
            }
        }
    }

    formatted_string
}

/// Format `date` for transaction rows, e.g. "Mar 01, 2024".
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}
