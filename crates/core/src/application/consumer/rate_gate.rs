// Rolling-Window Rate Gate
//
// Throttles job *starts*: at most `max_jobs` admits within any window of
// `window`, regardless of free concurrency slots. Used for queues whose
// downstream dependency (e.g. a shared database) must not be overloaded.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub struct RateGate {
    max_jobs: u32,
    window: Duration,
    // Start instants inside the current window, oldest first.
    // Never held across an await.
    starts: Mutex<VecDeque<Instant>>,
}

impl RateGate {
    pub fn new(max_jobs: u32, window: Duration) -> Self {
        Self {
            max_jobs,
            window,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until the window admits another job start, then record it.
    ///
    /// Admission is the moment of return; callers must start the job
    /// immediately afterwards for the window accounting to hold.
    pub async fn admit(&self) {
        loop {
            let wake_at = {
                let mut starts = self.starts.lock().unwrap();
                let now = Instant::now();

                while let Some(front) = starts.front() {
                    if now.duration_since(*front) >= self.window {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }

                if (starts.len() as u32) < self.max_jobs {
                    starts.push_back(now);
                    return;
                }

                // At capacity: the oldest start ages out of the window first
                match starts.front() {
                    Some(oldest) => *oldest + self.window,
                    None => now,
                }
            };

            tokio::time::sleep_until(wake_at).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_max_without_waiting() {
        let gate = RateGate::new(3, Duration::from_secs(60));

        let before = Instant::now();
        for _ in 0..3 {
            gate.admit().await;
        }
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn spaces_admits_by_the_window() {
        let gate = RateGate::new(1, Duration::from_millis(200));

        let before = Instant::now();
        for _ in 0..3 {
            gate.admit().await;
        }

        // Second and third admits each wait out a full window
        assert!(
            before.elapsed() >= Duration::from_millis(400),
            "3 admits at 1 per 200ms took {:?}",
            before.elapsed()
        );
    }

    #[tokio::test]
    async fn window_capacity_recovers_after_expiry() {
        let gate = RateGate::new(2, Duration::from_millis(100));

        gate.admit().await;
        gate.admit().await;

        let before = Instant::now();
        gate.admit().await;
        assert!(
            before.elapsed() >= Duration::from_millis(50),
            "third admit should have waited for the window"
        );
    }
}
