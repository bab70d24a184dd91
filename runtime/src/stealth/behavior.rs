//! Human-like behavior simulation.
//!
//! Every randomized pause and every random draw the mimicry needs goes
//! through a [`DelayModel`], so acquisition logic can run against a seeded
//! or fixed model in tests.

use crate::error::HarvestResult;
use crate::renderer::{Keystroke, NavigableBrowser};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Characters used for injected typos and junk runs.
const JUNK_CHARS: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!#$%&()*+,-./:;<=>?@[\\]^_`{|}~";

/// An inclusive millisecond range a delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Bounds with `min <= max`, whatever order they were configured in.
    fn ordered(self) -> (u64, u64) {
        if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        }
    }
}

/// Source of human-mimicking timing values and small random choices.
pub trait DelayModel: Send + Sync {
    /// Draw a delay from `range`.
    fn delay(&self, range: DelayRange) -> Duration;

    /// Draw an integer from `lo..=hi`.
    fn uniform(&self, lo: usize, hi: usize) -> usize;
}

/// Sleep for a delay drawn from `range`.
pub async fn pause(model: &dyn DelayModel, range: DelayRange) {
    tokio::time::sleep(model.delay(range)).await;
}

/// Send each key to `selector` with a delay drawn from `range` before it.
pub async fn human_type(
    browser: &mut dyn NavigableBrowser,
    selector: &str,
    keys: &[Keystroke],
    model: &dyn DelayModel,
    range: DelayRange,
) -> HarvestResult<()> {
    for key in keys {
        pause(model, range).await;
        browser.type_key(selector, *key).await?;
    }
    Ok(())
}

/// Uniformly jittered delays backed by a standard RNG.
pub struct HumanDelay {
    rng: Mutex<StdRng>,
}

impl HumanDelay {
    /// Create a delay model seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a reproducible delay model.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = match self.rng.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl DelayModel for HumanDelay {
    fn delay(&self, range: DelayRange) -> Duration {
        let (lo, hi) = range.ordered();
        let ms = self.with_rng(|rng| rng.gen_range(lo..=hi));
        Duration::from_millis(ms)
    }

    fn uniform(&self, lo: usize, hi: usize) -> usize {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.with_rng(|rng| rng.gen_range(lo..=hi))
    }
}

/// Deterministic model: always the lower bound. Used as a test double.
pub struct FixedDelay;

impl DelayModel for FixedDelay {
    fn delay(&self, range: DelayRange) -> Duration {
        Duration::from_millis(range.ordered().0)
    }

    fn uniform(&self, lo: usize, hi: usize) -> usize {
        lo.min(hi)
    }
}

fn junk_char(model: &dyn DelayModel) -> char {
    JUNK_CHARS[model.uniform(0, JUNK_CHARS.len() - 1)] as char
}

/// Plan the keystrokes for entering a username like a person would.
///
/// A junk character is typed at a random split point and immediately
/// deleted, then a run of `junk_min..=junk_max` junk characters is appended
/// and deleted one by one. The plan always nets out to exactly `username`.
pub fn username_keystrokes(
    username: &str,
    junk_min: usize,
    junk_max: usize,
    model: &dyn DelayModel,
) -> Vec<Keystroke> {
    let chars: Vec<char> = username.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let split = model.uniform(0, chars.len() - 1);
    let mut plan: Vec<Keystroke> = chars[..split].iter().copied().map(Keystroke::Char).collect();
    plan.push(Keystroke::Char(junk_char(model)));
    plan.push(Keystroke::Backspace);
    plan.extend(chars[split..].iter().copied().map(Keystroke::Char));

    let junk = model.uniform(junk_min, junk_max);
    for _ in 0..junk {
        plan.push(Keystroke::Char(junk_char(model)));
    }
    plan.extend(std::iter::repeat(Keystroke::Backspace).take(junk));

    plan
}

/// Plan plain character-by-character entry.
pub fn plain_keystrokes(text: &str) -> Vec<Keystroke> {
    text.chars().map(Keystroke::Char).collect()
}

/// Apply a keystroke plan to an empty field and return the resulting text.
pub fn apply_keystrokes(plan: &[Keystroke]) -> String {
    let mut field = String::new();
    for key in plan {
        match key {
            Keystroke::Char(c) => field.push(*c),
            Keystroke::Backspace => {
                field.pop();
            }
            Keystroke::Enter => {}
        }
    }
    field
}
