use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StatsTimer {
    start_time: Instant,
    finish_time: Option<Instant>,
}

impl Default for StatsTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTimer {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            finish_time: None,
        }
    }

    pub fn finish(&mut self) {
        self.finish_time = Some(Instant::now());
    }

    /// Time since start, frozen once the timer has finished.
    pub fn get_elapsed(&self) -> Duration {
        match self.finish_time {
            Some(finish) => finish.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }
}

/// `HH:MM:SS.mmm`, used where the value is read back by tools.
pub fn duration_string(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn duration_string_formats_hours_minutes_seconds() {
        let d = Duration::from_millis(3_723_045);
        assert_eq!(duration_string(d), "01:02:03.045");
    }

    #[test]
    fn finished_timer_stops_counting() {
        let mut timer = StatsTimer::new();
        timer.finish();
        let elapsed = timer.get_elapsed();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.get_elapsed(), elapsed);
    }
}
