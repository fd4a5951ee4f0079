//! Progress parsing from FFmpeg and melt stderr.

/// Snapshot of a running tool's progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolProgress {
    pub frame: u64,
    /// Output position in milliseconds (ffmpeg only)
    pub out_time_ms: i64,
    /// Realtime factor (ffmpeg only)
    pub speed: f64,
    /// Completion percentage, once the total is known
    pub percent: Option<f64>,
}

fn percent_of(position_ms: i64, total_ms: i64) -> f64 {
    if total_ms <= 0 {
        return 0.0;
    }
    (position_ms as f64 / total_ms as f64 * 100.0).min(100.0)
}

/// Line-oriented parser for tool stderr.
///
/// FFmpeg prints `Duration:` once while opening the input and periodic
/// `frame= ... time= ... speed=` statistics lines. Melt prints
/// `Current Frame: N, percentage: P` lines.
#[derive(Debug, Default)]
pub struct StderrProgressParser {
    duration_ms: Option<i64>,
    current: ToolProgress,
}

impl StderrProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input duration seen so far.
    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    /// Feed one stderr line, returning a snapshot when it carried progress.
    pub fn feed(&mut self, line: &str) -> Option<ToolProgress> {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Duration:") {
            if self.duration_ms.is_none() {
                let value = rest.split(',').next().unwrap_or_default().trim();
                self.duration_ms = parse_timecode_ms(value);
            }
            return None;
        }

        if let Some(rest) = line.strip_prefix("Current Frame:") {
            let (frame, percent) = rest.split_once(", percentage:")?;
            if let Ok(frame) = frame.trim().parse() {
                self.current.frame = frame;
            }
            if let Ok(percent) = percent.trim().parse::<f64>() {
                self.current.percent = Some(percent.min(100.0));
            }
            return Some(self.current.clone());
        }

        if !line.contains("time=") {
            return None;
        }

        let mut normalized = line.to_string();
        while normalized.contains("= ") {
            normalized = normalized.replace("= ", "=");
        }

        let mut saw_time = false;
        for (key, value) in normalized.split_whitespace().filter_map(|t| t.split_once('=')) {
            match key {
                "frame" => {
                    if let Ok(frame) = value.parse() {
                        self.current.frame = frame;
                    }
                }
                "time" => {
                    if let Some(ms) = parse_timecode_ms(value) {
                        self.current.out_time_ms = ms;
                        saw_time = true;
                    }
                }
                "speed" => {
                    // "1.5x", or "N/A" before the first frame
                    if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                        self.current.speed = speed;
                    }
                }
                _ => {}
            }
        }

        if !saw_time {
            return None;
        }
        if let Some(total) = self.duration_ms {
            self.current.percent = Some(percent_of(self.current.out_time_ms, total));
        }
        Some(self.current.clone())
    }
}

/// Parse `HH:MM:SS.frac` into milliseconds.
fn parse_timecode_ms(value: &str) -> Option<i64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 {
        return None;
    }
    Some(((hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert!((percent_of(5000, 10000) - 50.0).abs() < 0.01);
        assert_eq!(percent_of(5000, 0), 0.0);
        assert_eq!(percent_of(12000, 10000), 100.0);
    }

    #[test]
    fn test_timecode() {
        assert_eq!(parse_timecode_ms("01:02:03.50"), Some(3_723_500));
        assert_eq!(parse_timecode_ms("N/A"), None);
    }

    #[test]
    fn test_ffmpeg_stats_with_duration() {
        let mut parser = StderrProgressParser::new();
        assert!(parser
            .feed("  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s")
            .is_none());
        assert_eq!(parser.duration_ms(), Some(10_000));

        let progress = parser
            .feed("frame=  125 fps= 50 q=28.0 size=    1024kB time=00:00:05.00 bitrate=1677.7kbits/s speed=2.00x")
            .unwrap();
        assert_eq!(progress.frame, 125);
        assert_eq!(progress.out_time_ms, 5000);
        assert!((progress.speed - 2.0).abs() < 0.01);
        assert!((progress.percent.unwrap() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_melt_progress() {
        let mut parser = StderrProgressParser::new();
        let progress = parser.feed("Current Frame:          1, percentage:        100").unwrap();
        assert_eq!(progress.frame, 1);
        assert_eq!(progress.percent, Some(100.0));
    }

    #[test]
    fn test_ignores_unrelated_lines() {
        let mut parser = StderrProgressParser::new();
        assert!(parser.feed("Stream #0:0: Video: h264").is_none());
        assert!(parser.feed("time=N/A").is_none());
    }
}
