//! Conversion of runner response lines into typed values.
//!
//! An empty response means the query found nothing and maps to `None`.

use crate::error::{AhkError, Result};
use crate::geometry::Point;

/// `None` for a blank response, the text as sent otherwise.
pub fn text(response: String) -> Option<String> {
    if response.trim().is_empty() {
        None
    } else {
        Some(response)
    }
}

/// Parse an `"x y"` coordinate pair.
pub fn point(command: &str, response: &str) -> Result<Option<Point>> {
    let mut parts = response.split_whitespace();
    let Some(x) = parts.next() else {
        return Ok(None);
    };
    let y = parts
        .next()
        .ok_or_else(|| AhkError::invalid_response(command, response, "expected two coordinates"))?;

    let parse = |value: &str| {
        value.parse::<f64>().map_err(|e| {
            AhkError::invalid_response(command, response, format!("bad coordinate '{}': {}", value, e))
        })
    };
    Ok(Some(Point::new(parse(x)?, parse(y)?)))
}

/// Interpret a numeric flag: any non-zero number is true, empty is false.
pub fn flag(command: &str, response: &str) -> Result<bool> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n != 0);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return Ok(n != 0);
        }
    }
    trimmed
        .parse::<f64>()
        .map(|n| n != 0.0)
        .map_err(|_| AhkError::invalid_response(command, response, "expected a number"))
}
