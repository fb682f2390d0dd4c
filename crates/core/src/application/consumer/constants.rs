// Consumer constants (no magic values in the loop)

use std::time::Duration;

/// Sleep duration when the queue has no jobs available (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after a transport error before the next fetch (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);
