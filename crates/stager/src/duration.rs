use std::time::Duration;

/// Parse a small duration grammar: a run of `<digits><unit>` pairs, units
/// `ms`, `s`, `m`, `h` (e.g. `"5m"`, `"1h30m"`, `"200ms"`).
///
/// Supports just these few suffixes rather than pulling in a
/// duration-parsing crate for a single config field.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration string".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    let mut matched_any = false;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| format!("duration {input:?} has no unit after its number"))?;
        if digits_end == 0 {
            return Err(format!("duration {input:?} does not start with a number"));
        }
        let (number, unit_rest) = rest.split_at(digits_end);
        let number: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {number:?} in duration {input:?}"))?;

        let (unit_len, seconds_per_unit) = if let Some(stripped) = unit_rest.strip_prefix("ms") {
            let _ = stripped;
            (2, 0.001)
        } else if unit_rest.starts_with('s') {
            (1, 1.0)
        } else if unit_rest.starts_with('m') {
            (1, 60.0)
        } else if unit_rest.starts_with('h') {
            (1, 3600.0)
        } else {
            return Err(format!("unrecognised duration unit in {input:?}"));
        };

        total += Duration::from_secs_f64(number * seconds_per_unit);
        matched_any = true;
        rest = &unit_rest[unit_len..];
    }

    if !matched_any {
        return Err(format!("duration {input:?} contains no value"));
    }
    Ok(total)
}
