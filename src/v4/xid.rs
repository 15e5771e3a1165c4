//! Transaction-id generation.
//!
//! A process-wide pseudo-random generator, seeded once on first use from OS
//! entropy. The ids only need a low collision probability among clients
//! sharing a link, not unpredictability.

use rand::{rngs::StdRng, RngCore, SeedableRng, TryRngCore};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static GENERATOR: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn seed() -> u64 {
    match rand::rngs::OsRng.try_next_u64() {
        Ok(seed) => seed,
        Err(e) => {
            tracing::warn!("could not seed from OS entropy, falling back to clock: {e}");
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        }
    }
}

/// Returns the next transaction id from the process-wide sequence.
/// Seeding happens exactly once, on the first call.
pub fn next_xid() -> u32 {
    let generator = GENERATOR.get_or_init(|| Mutex::new(StdRng::seed_from_u64(seed())));
    generator.lock().unwrap().next_u32()
}
