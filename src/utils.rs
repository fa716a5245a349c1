use chrono::{DateTime, Utc};

/// Whole seconds elapsed since `started_at`.
pub fn uptime_seconds(started_at: DateTime<Utc>) -> i64 {
    (Utc::now() - started_at).num_seconds().max(0)
}

/// Accepts only a single, non-special path component.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn file_names_must_be_single_components() {
        assert!(is_safe_file_name("server.jar"));
        assert!(is_safe_file_name(".hidden"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name(".."));
        assert!(!is_safe_file_name("../eula.txt"));
        assert!(!is_safe_file_name("world/level.dat"));
        assert!(!is_safe_file_name("a\\b"));
    }

    #[test]
    fn uptime_counts_seconds() {
        let started = Utc::now() - Duration::seconds(90);
        let up = uptime_seconds(started);
        assert!((90..=91).contains(&up));
        assert_eq!(uptime_seconds(Utc::now() + Duration::seconds(5)), 0);
    }
}
