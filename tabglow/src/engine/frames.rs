//! Frame tables for the title animation.

/// Moon phases cycled at the start of the title
pub const MOON_PHASES: [&str; 8] = ["🌑", "🌒", "🌓", "🌔", "🌕", "🌖", "🌗", "🌘"];

pub const STARS: [&str; 4] = ["🌟", "✨", "💫", "⭐"];
pub const HOURGLASS: [&str; 2] = ["⏳", "⌛"];
pub const RAINBOW: [&str; 6] = ["🟥", "🟧", "🟨", "🟩", "🟦", "🟪"];
pub const FIRE: [&str; 4] = ["🔥", "🔥", "🔥", "🔥"];

/// Grows to five flames and back
pub const FIRE_BURST: [&str; 9] = [
    "🔥",
    "🔥🔥",
    "🔥🔥🔥",
    "🔥🔥🔥🔥",
    "🔥🔥🔥🔥🔥",
    "🔥🔥🔥🔥",
    "🔥🔥🔥",
    "🔥🔥",
    "🔥",
];

fn owned(frames: &[&str]) -> Vec<String> {
    frames.iter().map(|f| f.to_string()).collect()
}

/// Animation frames as a value, so tests and callers can supply their own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTable {
    /// Cycled before the baseline
    pub prefix: Vec<String>,
    /// Independent sequences, each cycled and concatenated after the baseline
    pub suffixes: Vec<Vec<String>>,
    /// Played once by the burst, on both sides of the baseline
    pub burst: Vec<String>,
}

impl Default for FrameTable {
    fn default() -> Self {
        Self {
            prefix: owned(&MOON_PHASES),
            suffixes: vec![
                owned(&STARS),
                owned(&HOURGLASS),
                owned(&RAINBOW),
                owned(&FIRE),
            ],
            burst: owned(&FIRE_BURST),
        }
    }
}

fn cycled(sequence: &[String], frame: u64) -> &str {
    if sequence.is_empty() {
        return "";
    }
    &sequence[(frame % sequence.len() as u64) as usize]
}

impl FrameTable {
    /// Title for frame `frame`: `"{prefix} {baseline} {suffixes}"`
    pub fn compose(&self, frame: u64, baseline: &str) -> String {
        let suffix: String = self
            .suffixes
            .iter()
            .map(|sequence| cycled(sequence, frame))
            .collect();
        format!("{} {} {}", cycled(&self.prefix, frame), baseline, suffix)
    }

    /// Burst titles in order, without the final plain baseline
    pub fn burst_frames(&self, baseline: &str) -> Vec<String> {
        self.burst
            .iter()
            .map(|fire| format!("{} {} {}", fire, baseline, fire))
            .collect()
    }
}
