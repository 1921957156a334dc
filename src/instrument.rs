use std::future::Future;
use std::time::{Duration, Instant};

/// Output of an instrumented future together with its monotonic wall time.
#[derive(Debug)]
pub struct Timed<T> {
    pub output: T,
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn into_inner(self) -> T {
        self.output
    }
}

/// Await `fut` and measure it. The output (including any error) is returned untouched.
pub async fn instrument<F>(fut: F) -> Timed<F::Output>
where
    F: Future,
{
    let start = Instant::now();
    let output = fut.await;
    Timed {
        output,
        elapsed: start.elapsed(),
    }
}
