//! Spreadsheet number format codes.
//!
//! Renders a value through a code such as `#,##0.00`, `0%` or
//! `m/d/yy h:mm` the way a spreadsheet displays it. A code has up to
//! four `;`-separated sections (positive, negative, zero, text).
//!
//! Supported inside a section: quoted and escaped literals, `_` padding,
//! `0 # ?` digit placeholders with grouping and trailing-comma scaling,
//! percent, `E+`/`E-` exponents, calendar parts (`y m d h s`), elapsed
//! parts (`[h] [mm] [ss]`), fractional seconds, `AM/PM` and `A/P`.
//! Colours, locale tags and conditions in brackets are ignored.
//! Fraction codes (`# ?/?`) fall back to general rendering.

use crate::error::CellFormatError;
use crate::format::{general, serial_to_date, SECONDS_PER_DAY};
use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    /// `0`, `#` or `?`.
    Digit(char),
    Point,
    Comma,
    Percent,
    Exponent { plus: bool },
    Text,
    General,
    Year(usize),
    /// Ambiguous `m` run, resolved to minutes by its neighbours.
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    /// `[h]`, `[mm]`, `[ss]`: total elapsed units, not wrapped.
    Elapsed(char, usize),
    SubSecond(usize),
    AmPm { short: bool, upper: bool },
}

impl Token {
    fn is_date_part(&self) -> bool {
        matches!(
            self,
            Token::Year(_)
                | Token::Month(_)
                | Token::Minute(_)
                | Token::Day(_)
                | Token::Hour(_)
                | Token::Second(_)
                | Token::Elapsed(..)
                | Token::AmPm { .. }
        )
    }
}

/// Renders a numeric value (plain number, date serial or duration serial)
/// through `code`.
pub fn format_number(value: f64, code: &str) -> Result<String, CellFormatError> {
    if !value.is_finite() {
        return Err(CellFormatError::NonFinite);
    }

    let sections = split_sections(code);
    let (section, value, signed) = match sections.len() {
        1 => (sections[0], value.abs(), value < 0.0),
        2 if value < 0.0 => (sections[1], value.abs(), false),
        2 => (sections[0], value, false),
        _ if value < 0.0 => (sections[1], value.abs(), false),
        _ if value == 0.0 => (sections[2], value, false),
        _ => (sections[0], value, false),
    };

    let tokens = tokenize(section);
    if tokens.iter().any(Token::is_date_part) {
        if signed {
            return Err(CellFormatError::DateOutOfRange(-value));
        }
        return format_date(value, &resolve_date_tokens(tokens));
    }
    format_numeric(value, signed, &tokens)
}

/// Renders a text cell through the text section of `code`.
///
/// Codes without a text section leave the text unchanged.
pub fn format_text(text: &str, code: &str) -> String {
    let sections = split_sections(code);
    let section = match sections.len() {
        4.. => sections[3],
        _ => match sections.last() {
            Some(&last) if tokenize(last).contains(&Token::Text) => last,
            _ => return text.to_string(),
        },
    };

    let mut out = String::new();
    for token in tokenize(section) {
        match token {
            Token::Literal(s) => out.push_str(&s),
            Token::Text => out.push_str(text),
            _ => {}
        }
    }
    out
}

/// Splits on `;` outside quotes, escapes and brackets.
fn split_sections(code: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let (mut quoted, mut bracket, mut escaped) = (false, false, false);

    for (i, c) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' | '_' | '*' if !quoted => escaped = true,
            '"' => quoted = !quoted,
            '[' if !quoted => bracket = true,
            ']' if !quoted => bracket = false,
            ';' if !quoted && !bracket => {
                sections.push(&code[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(&code[start..]);
    sections
}

fn starts_with_ignore_case(chars: &[char], word: &str) -> bool {
    chars.len() >= word.len()
        && chars
            .iter()
            .zip(word.chars())
            .all(|(c, w)| c.eq_ignore_ascii_case(&w))
}

fn tokenize(section: &str) -> Vec<Token> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let rest = &chars[i..];
        i += 1;

        match c {
            '"' => {
                let mut literal = String::new();
                while i < chars.len() && chars[i] != '"' {
                    literal.push(chars[i]);
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Literal(literal));
            }
            '\\' => {
                if let Some(next) = chars.get(i) {
                    tokens.push(Token::Literal(next.to_string()));
                    i += 1;
                }
            }
            // `_x` pads with the width of x, `*x` repeats x to fill the column.
            '_' => {
                i += 1;
                tokens.push(Token::Literal(" ".into()));
            }
            '*' => i += 1,
            '[' => {
                let mut content = String::new();
                while i < chars.len() && chars[i] != ']' {
                    content.push(chars[i]);
                    i += 1;
                }
                i += 1;
                tokens.extend(bracket_token(&content));
            }
            '0' | '#' | '?' => tokens.push(Token::Digit(c)),
            '.' => tokens.push(Token::Point),
            ',' => tokens.push(Token::Comma),
            '%' => tokens.push(Token::Percent),
            '@' => tokens.push(Token::Text),
            'E' | 'e' if matches!(chars.get(i), Some('+' | '-')) => {
                tokens.push(Token::Exponent {
                    plus: chars[i] == '+',
                });
                i += 1;
            }
            'G' | 'g' if starts_with_ignore_case(rest, "general") => {
                i += 6;
                tokens.push(Token::General);
            }
            'A' | 'a' if starts_with_ignore_case(rest, "am/pm") => {
                i += 4;
                tokens.push(Token::AmPm {
                    short: false,
                    upper: c == 'A',
                });
            }
            'A' | 'a' if starts_with_ignore_case(rest, "a/p") => {
                i += 2;
                tokens.push(Token::AmPm {
                    short: true,
                    upper: c == 'A',
                });
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let lower = c.to_ascii_lowercase();
                let mut run = 1;
                while chars
                    .get(i)
                    .is_some_and(|next| next.to_ascii_lowercase() == lower)
                {
                    run += 1;
                    i += 1;
                }
                tokens.push(match lower {
                    'y' => Token::Year(run),
                    'm' => Token::Month(run),
                    'd' => Token::Day(run),
                    'h' => Token::Hour(run),
                    _ => Token::Second(run),
                });
            }
            _ => tokens.push(Token::Literal(c.to_string())),
        }
    }
    tokens
}

fn bracket_token(content: &str) -> Option<Token> {
    let lower = content.to_ascii_lowercase();
    if let Some(unit) = lower.chars().next() {
        if matches!(unit, 'h' | 'm' | 's') && lower.chars().all(|c| c == unit) {
            return Some(Token::Elapsed(unit, lower.len()));
        }
    }
    // `[$€-407]`: currency symbol followed by a locale id.
    let symbol = content.strip_prefix('$')?.split('-').next()?;
    (!symbol.is_empty()).then(|| Token::Literal(symbol.to_string()))
}

/// Turns `m` runs next to hours or seconds into minutes, a `.0` run after
/// seconds into fractional seconds, and number-only tokens into literals.
fn resolve_date_tokens(mut tokens: Vec<Token>) -> Vec<Token> {
    let parts: Vec<usize> = (0..tokens.len())
        .filter(|&i| tokens[i].is_date_part())
        .collect();

    for (k, &idx) in parts.iter().enumerate() {
        let Token::Month(run) = tokens[idx] else {
            continue;
        };
        if run > 2 {
            continue;
        }
        let after_hour = k
            .checked_sub(1)
            .is_some_and(|p| matches!(tokens[parts[p]], Token::Hour(_) | Token::Elapsed('h', _)));
        let before_second = parts
            .get(k + 1)
            .is_some_and(|&q| matches!(tokens[q], Token::Second(_) | Token::Elapsed('s', _)));
        if after_hour || before_second {
            tokens[idx] = Token::Minute(run);
        }
    }

    let mut resolved = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token {
            Token::Point if matches!(iter.peek(), Some(Token::Digit('0'))) => {
                let mut digits = 0;
                while matches!(iter.peek(), Some(Token::Digit('0'))) {
                    iter.next();
                    digits += 1;
                }
                resolved.push(Token::SubSecond(digits));
            }
            Token::Point => resolved.push(Token::Literal(".".into())),
            Token::Comma => resolved.push(Token::Literal(",".into())),
            Token::Percent => resolved.push(Token::Literal("%".into())),
            Token::Digit(c) => resolved.push(Token::Literal(c.to_string())),
            Token::Exponent { .. } | Token::General | Token::Text => {}
            other => resolved.push(other),
        }
    }
    resolved
}

fn pad(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width.min(2))
}

fn format_date(serial: f64, tokens: &[Token]) -> Result<String, CellFormatError> {
    if serial < 0.0 {
        return Err(CellFormatError::DateOutOfRange(serial));
    }

    let sub_digits = tokens
        .iter()
        .find_map(|t| match t {
            Token::SubSecond(n) => Some((*n).min(3)),
            _ => None,
        })
        .unwrap_or(0);
    let scale = 10u64.pow(sub_digits as u32);
    let units = (serial * SECONDS_PER_DAY * scale as f64).round();
    if units >= 1e18 {
        return Err(CellFormatError::DateOutOfRange(serial));
    }
    let units = units as u64;

    let total_seconds = units / scale;
    let fraction = units % scale;
    let day_seconds = total_seconds % 86_400;
    let (hour, minute, second) = (day_seconds / 3600, day_seconds % 3600 / 60, day_seconds % 60);

    let date: Option<NaiveDate> =
        if tokens.iter().any(|t| matches!(t, Token::Year(_) | Token::Month(_) | Token::Day(_))) {
            Some(serial_to_date(total_seconds / 86_400, serial)?)
        } else {
            None
        };
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm { .. }));

    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Hour(run) => {
                let shown = match (twelve_hour, hour % 12) {
                    (true, 0) => 12,
                    (true, h) => h,
                    (false, _) => hour,
                };
                out.push_str(&pad(shown, *run));
            }
            Token::Minute(run) => out.push_str(&pad(minute, *run)),
            Token::Second(run) => out.push_str(&pad(second, *run)),
            Token::Elapsed(unit, run) => {
                let total = match unit {
                    'h' => total_seconds / 3600,
                    'm' => total_seconds / 60,
                    _ => total_seconds,
                };
                out.push_str(&format!("{:0width$}", total, width = *run));
            }
            Token::SubSecond(run) => {
                out.push('.');
                if sub_digits > 0 {
                    out.push_str(&format!("{:0width$}", fraction, width = sub_digits));
                }
                out.push_str(&"0".repeat(run.saturating_sub(sub_digits)));
            }
            Token::AmPm { short, upper } => {
                let text = match (hour < 12, short) {
                    (true, false) => "AM",
                    (false, false) => "PM",
                    (true, true) => "A",
                    (false, true) => "P",
                };
                if *upper {
                    out.push_str(text);
                } else {
                    out.push_str(&text.to_ascii_lowercase());
                }
            }
            Token::Year(run) | Token::Month(run) | Token::Day(run) => {
                if let Some(date) = date {
                    out.push_str(&calendar_part(token, *run, date));
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

fn calendar_part(token: &Token, run: usize, date: NaiveDate) -> String {
    match (token, run) {
        (Token::Year(1..=2), _) => format!("{:02}", date.year() % 100),
        (Token::Year(_), _) => format!("{:04}", date.year()),
        (Token::Month(_), 1 | 2) => pad(u64::from(date.month()), run),
        (Token::Month(_), 3) => MONTHS[date.month0() as usize][..3].to_string(),
        (Token::Month(_), 4) => MONTHS[date.month0() as usize].to_string(),
        (Token::Month(_), _) => MONTHS[date.month0() as usize][..1].to_string(),
        (Token::Day(_), 1 | 2) => pad(u64::from(date.day()), run),
        (Token::Day(_), 3) => {
            WEEKDAYS[date.weekday().num_days_from_monday() as usize][..3].to_string()
        }
        (Token::Day(_), _) => WEEKDAYS[date.weekday().num_days_from_monday() as usize].to_string(),
        _ => String::new(),
    }
}

/// Rounds half away from zero, the way spreadsheets do. Binary noise
/// below nine decimals is dropped first so `2.345` rounds up.
fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let cleaned = format!("{:.9}", scaled).parse::<f64>().unwrap_or(scaled);
    cleaned.round() / factor
}

fn format_numeric(value: f64, signed: bool, tokens: &[Token]) -> Result<String, CellFormatError> {
    let digit_count = tokens.iter().filter(|t| matches!(t, Token::Digit(_))).count();
    let is_fraction = tokens.iter().any(|t| matches!(t, Token::Literal(s) if s == "/"));

    if digit_count == 0 || is_fraction {
        let uses_value = is_fraction
            || tokens
                .iter()
                .any(|t| matches!(t, Token::General | Token::Text));
        let body = general(value)?;
        let mut out = String::new();
        if signed && uses_value {
            out.push('-');
        }
        if is_fraction {
            out.push_str(&body);
            return Ok(out);
        }
        for token in tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::General | Token::Text => out.push_str(&body),
                Token::Percent => out.push('%'),
                _ => {}
            }
        }
        return Ok(out);
    }

    let mantissa_end = tokens
        .iter()
        .position(|t| matches!(t, Token::Exponent { .. }))
        .unwrap_or(tokens.len());
    let point = tokens[..mantissa_end]
        .iter()
        .position(|t| *t == Token::Point);
    let int_end = point.unwrap_or(mantissa_end);
    let last_digit = tokens[..mantissa_end]
        .iter()
        .rposition(|t| matches!(t, Token::Digit(_)))
        .unwrap_or(0);

    let int_places: Vec<char> = digits_in(&tokens[..int_end]);
    let frac_places: Vec<char> = digits_in(&tokens[int_end..mantissa_end]);
    let exp_places: Vec<char> = digits_in(&tokens[mantissa_end..]);

    let grouping = tokens[..int_end]
        .iter()
        .enumerate()
        .any(|(i, t)| *t == Token::Comma && i < last_digit);
    let scaling = tokens[..mantissa_end]
        .iter()
        .enumerate()
        .filter(|(i, t)| **t == Token::Comma && *i > last_digit)
        .count();
    let percents = tokens.iter().filter(|t| **t == Token::Percent).count();

    let scaled = value * 100f64.powi(percents as i32) / 1000f64.powi(scaling as i32);

    let (mantissa, exponent) = if mantissa_end < tokens.len() {
        scientific(scaled, int_places.len().max(1), frac_places.len())
    } else {
        (round_to(scaled, frac_places.len()), 0)
    };

    let fixed = format!("{:.*}", frac_places.len(), mantissa);
    let (int_str, frac_str) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let int_digits: Vec<char> = if int_str == "0" {
        Vec::new()
    } else {
        int_str.chars().collect()
    };
    let frac_digits: Vec<char> = frac_str.chars().collect();
    let frac_keep = frac_places
        .iter()
        .enumerate()
        .rposition(|(j, p)| *p == '0' || frac_digits.get(j).is_some_and(|d| *d != '0'))
        .map_or(0, |j| j + 1);

    let mut out = String::new();
    if signed && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }

    let n_int = int_places.len();
    let k = int_digits.len();
    let (mut int_seen, mut frac_seen) = (0, 0);

    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Digit(place) if idx < int_end => {
                if int_seen == 0 && k > n_int {
                    for (offset, d) in int_digits[..k - n_int].iter().enumerate() {
                        out.push(*d);
                        if grouping && (k - 1 - offset) % 3 == 0 {
                            out.push(',');
                        }
                    }
                }
                let from_right = n_int - 1 - int_seen;
                let digit = if from_right < k {
                    Some(int_digits[k - 1 - from_right])
                } else {
                    match place {
                        '0' => Some('0'),
                        '?' => {
                            out.push(' ');
                            None
                        }
                        _ => None,
                    }
                };
                if let Some(d) = digit {
                    out.push(d);
                    if grouping && from_right > 0 && from_right % 3 == 0 {
                        out.push(',');
                    }
                }
                int_seen += 1;
            }
            Token::Digit(place) if idx < mantissa_end => {
                if frac_seen < frac_keep {
                    out.push(frac_digits.get(frac_seen).copied().unwrap_or('0'));
                } else if *place == '?' {
                    out.push(' ');
                }
                frac_seen += 1;
            }
            Token::Digit(_) | Token::Comma | Token::Text | Token::General => {}
            Token::Point => {
                if n_int == 0 && Some(idx) == point {
                    out.extend(int_digits.iter());
                }
                out.push('.');
            }
            Token::Percent => out.push('%'),
            Token::Exponent { plus } => {
                out.push('E');
                if exponent < 0 {
                    out.push('-');
                } else if *plus {
                    out.push('+');
                }
                let width = exp_places.iter().filter(|p| **p == '0').count().max(1);
                out.push_str(&format!("{:0width$}", exponent.unsigned_abs(), width = width));
            }
            Token::Literal(s) => out.push_str(s),
            _ => {}
        }
    }
    Ok(out)
}

fn digits_in(tokens: &[Token]) -> Vec<char> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Digit(c) => Some(*c),
            _ => None,
        })
        .collect()
}

/// Splits `value` into a rounded mantissa and a power of ten. With more
/// than one integer placeholder the exponent is a multiple of their count.
fn scientific(value: f64, int_places: usize, decimals: usize) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }
    let step = int_places as i32;
    let mut exponent = value.log10().floor() as i32;
    if step > 1 {
        exponent -= exponent.rem_euclid(step);
    }
    let mut mantissa = round_to(value / 10f64.powi(exponent), decimals);
    if mantissa >= 10f64.powi(step) {
        exponent += step;
        mantissa = round_to(value / 10f64.powi(exponent), decimals);
    }
    (mantissa, exponent)
}
