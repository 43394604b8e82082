use chrono::Local;

pub(super) fn format_clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub(super) fn truncate_label(value: &str, max_chars: usize) -> String {
    let count = value.chars().count();
    if count <= max_chars {
        return value.to_string();
    }

    if max_chars <= 3 {
        return value.chars().take(max_chars).collect();
    }

    let prefix: String = value.chars().take(max_chars - 3).collect();
    format!("{}...", prefix)
}

/// Spaces needed between a left label and a right-aligned value so the
/// value ends at `width`. Always at least one.
pub(super) fn gap_before(label: &str, value: &str, width: usize) -> usize {
    width
        .saturating_sub(label.chars().count() + value.chars().count())
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::{gap_before, truncate_label};

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Project", 10), "Project");
        assert_eq!(truncate_label("Long project name", 10), "Long pr...");
        assert_eq!(truncate_label("Project", 2), "Pr");
    }

    #[test]
    fn test_gap_before_right_aligns() {
        assert_eq!(gap_before("p: Project", "00:00:01", 30), 12);
        assert_eq!(gap_before("p: Project", "00:00:01", 5), 1);
    }
}
