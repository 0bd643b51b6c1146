/// Leaderboard scores are frame counts recorded at this rate.
pub const FRAMES_PER_SECOND: u64 = 30;

/// Format a frame count as `[{m}m ]{s}s {f}F`. Minutes are omitted when zero.
pub fn format_time(frames: u64) -> String {
    let total_seconds = frames / FRAMES_PER_SECOND;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let remainder_frames = frames % FRAMES_PER_SECOND;

    match minutes {
        0 => format!("{seconds}s {remainder_frames}F"),
        m => format!("{m}m {seconds}s {remainder_frames}F"),
    }
}
