/// Formats milliseconds as `m:ss`.
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

/// Parses a position given either as `m:ss` or as plain milliseconds.
pub fn parse_position(value: &str) -> Result<u64, String> {
    let value = value.trim();
    match value.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes
                .parse()
                .map_err(|_| format!("invalid minutes in '{}'", value))?;
            let seconds: u64 = seconds
                .parse()
                .map_err(|_| format!("invalid seconds in '{}'", value))?;
            if seconds >= 60 {
                return Err(format!("seconds out of range in '{}'", value));
            }
            Ok((minutes * 60 + seconds) * 1000)
        }
        None => value
            .parse()
            .map_err(|_| format!("invalid position '{}'", value)),
    }
}

/// Clamps any requested volume into `[0, 100]`.
pub fn clamp_volume(percent: i64) -> u8 {
    percent.clamp(0, 100) as u8
}

pub fn join_artists(names: &[String]) -> String {
    names.join(", ")
}
