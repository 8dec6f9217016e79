/// Human-readable sizes, counts and percentage bars.
///
/// All internal sizes are `u64` bytes. Floating point only appears at the
/// display-formatting boundary.

/// Width of the bar drawn by [`percent_bar`].
pub const BAR_WIDTH: usize = 10;

/// Format a byte count with binary units labelled KB/MB/GB/TB.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else if b < TB {
        format!("{:.2} GB", b / GB)
    } else {
        format!("{:.2} TB", b / TB)
    }
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a share of the parent as an ncdu-style `[#####     ]` bar.
pub fn percent_bar(percent: f32) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

/// Shorten `text` to at most `max` characters, keeping the tail and
/// marking the cut with a leading `...`.
pub fn shorten_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max || max <= 3 {
        return text.to_string();
    }
    let keep = max - 3;
    let tail: String = text.chars().skip(count - keep).collect();
    format!("...{tail}")
}
