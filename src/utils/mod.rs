use std::time::Instant;
use tracing::info;

/// Logs when a command stage starts and, on drop, how long it ran.
pub struct Timer {
    stage: String,
    started: Instant,
}

impl Timer {
    pub fn start(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        info!(stage = %stage, "started");
        Self {
            stage,
            started: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            stage = %self.stage,
            elapsed = ?self.started.elapsed(),
            "finished"
        );
    }
}

/// Row and symbol counts with `,` between thousands, for the stats output.
pub fn fmt_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let head = digits.len() % 3;

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
