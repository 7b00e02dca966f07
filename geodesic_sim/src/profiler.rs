//! Lightweight CPU frame timing with rolling statistics.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_FRAME_SAMPLES: usize = 60;

#[derive(Debug, Clone, Copy, Default)]
pub struct TimingSample {
    pub frame_ms: f32,
    pub update_ms: f32,
    pub encode_ms: f32,
}

pub struct Profiler {
    frame_start: Option<Instant>,
    update_start: Option<Instant>,
    encode_start: Option<Instant>,
    current: TimingSample,
    samples: VecDeque<TimingSample>,
    last_report: Instant,
    frame_count: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            frame_start: None,
            update_start: None,
            encode_start: None,
            current: TimingSample::default(),
            samples: VecDeque::with_capacity(MAX_FRAME_SAMPLES),
            last_report: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
        self.current = TimingSample::default();
    }

    pub fn begin_update(&mut self) {
        self.update_start = Some(Instant::now());
    }

    pub fn end_update(&mut self) {
        if let Some(start) = self.update_start.take() {
            self.current.update_ms = start.elapsed().as_secs_f32() * 1000.0;
        }
    }

    pub fn begin_encode(&mut self) {
        self.encode_start = Some(Instant::now());
    }

    pub fn end_encode(&mut self) {
        if let Some(start) = self.encode_start.take() {
            self.current.encode_ms = start.elapsed().as_secs_f32() * 1000.0;
        }
    }

    /// Close the frame sample and periodically log the rolling averages
    pub fn end_frame(&mut self) {
        if let Some(start) = self.frame_start.take() {
            self.current.frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        }
        if self.samples.len() == MAX_FRAME_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(self.current);
        self.frame_count += 1;

        if self.last_report.elapsed() >= Duration::from_secs(1) {
            let avg = self.average();
            log::debug!(
                "frame {:.2} ms (update {:.2}, encode {:.2}) over {} samples",
                avg.frame_ms,
                avg.update_ms,
                avg.encode_ms,
                self.samples.len()
            );
            self.last_report = Instant::now();
        }
    }

    pub fn average(&self) -> TimingSample {
        let n = self.samples.len().max(1) as f32;
        let mut sum = TimingSample::default();
        for s in &self.samples {
            sum.frame_ms += s.frame_ms;
            sum.update_ms += s.update_ms;
            sum.encode_ms += s.encode_ms;
        }
        TimingSample {
            frame_ms: sum.frame_ms / n,
            update_ms: sum.update_ms / n,
            encode_ms: sum.encode_ms / n,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_window_is_bounded() {
        let mut p = Profiler::new();
        for _ in 0..(MAX_FRAME_SAMPLES + 20) {
            p.begin_frame();
            p.end_frame();
        }
        assert_eq!(p.samples.len(), MAX_FRAME_SAMPLES);
        assert_eq!(p.frame_count(), (MAX_FRAME_SAMPLES + 20) as u64);
    }

    #[test]
    fn spans_are_recorded() {
        let mut p = Profiler::new();
        p.begin_frame();
        p.begin_update();
        std::thread::sleep(Duration::from_millis(2));
        p.end_update();
        p.end_frame();
        let avg = p.average();
        assert!(avg.update_ms >= 1.0);
        assert!(avg.frame_ms >= avg.update_ms);
    }
}
