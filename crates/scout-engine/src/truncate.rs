pub const DEFAULT_MAX_OUTPUT: usize = 64 * 1024;

/// Cut `output` to at most `max_bytes` on a char boundary and append a size marker.
pub fn truncate_output(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut boundary = max_bytes;
    while !output.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!(
        "{}\n\n[truncated: {} bytes -> {} bytes]",
        &output[..boundary],
        output.len(),
        boundary
    )
}

/// First `chars` characters, for event previews.
pub fn preview(output: &str, chars: usize) -> String {
    output.chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limit_untouched() {
        assert_eq!(truncate_output("hello", 1024), "hello");
        let exact = "a".repeat(100);
        assert_eq!(truncate_output(&exact, 100), exact);
    }

    #[test]
    fn one_over_truncates() {
        let result = truncate_output(&"a".repeat(101), 100);
        assert!(result.ends_with("[truncated: 101 bytes -> 100 bytes]"));
    }

    #[test]
    fn respects_char_boundary() {
        // 'é' is two bytes
        let result = truncate_output(&"é".repeat(10), 5);
        assert!(result.starts_with("éé\n"));
        assert!(result.contains("[truncated: 20 bytes -> 4 bytes]"));
    }

    #[test]
    fn preview_counts_chars() {
        assert_eq!(preview("Aeron Chair", 5), "Aeron");
        assert_eq!(preview("ab", 10), "ab");
    }
}
