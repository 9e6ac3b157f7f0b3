//! Input sanitisation and generated-code checks

use regex::Regex;
use std::sync::OnceLock;

/// Sanitize a name for use as a GitHub repository name.
///
/// Lowercases, maps anything outside `[a-z0-9-]` to `-`, collapses runs of
/// `-`, trims leading/trailing `-` and caps the length.
pub fn sanitize_repo_name(name: &str, max_len: usize) -> Result<String, String> {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let mut out = out.trim_matches('-').to_string();
    if out.is_empty() {
        return Err(format!("Repository name too short: {:?}", name));
    }

    if out.len() > max_len {
        out.truncate(max_len);
        out = out.trim_end_matches('-').to_string();
    }
    Ok(out)
}

/// Whether GitHub accepts `name` as-is: 1..=`max_len` characters from
/// `[A-Za-z0-9._-]`, and not `.` or `..`
pub fn is_valid_repo_name(name: &str, max_len: usize) -> bool {
    !name.is_empty()
        && name.len() <= max_len
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Make free text safe for a one-line repository description
pub fn sanitize_description(text: &str, max_len: usize) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_len).collect::<String>().trim_end().to_string()
}

fn dangerous_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"\beval\s*\(", "Use of eval()"),
            (r"new\s+Function\s*\(", "Dynamic Function constructor"),
            (r"document\.write\s*\(", "Use of document.write()"),
            (r"(?s)innerHTML\s*=.*<script", "Script injected through innerHTML"),
            (r"subprocess\.(?:call|run|Popen).*shell\s*=\s*True", "Shell injection risk"),
            (r"os\.system\s*\(", "Direct os.system() call"),
            (r"rm\s+-rf", "Dangerous shell command"),
            (r"DROP\s+TABLE", "SQL DROP command"),
        ]
        .into_iter()
        .filter_map(|(pattern, label)| {
            Regex::new(&format!("(?i){}", pattern))
                .ok()
                .map(|re| (re, label))
        })
        .collect()
    })
}

/// Scan generated code for dangerous patterns; returns one warning per hit
pub fn scan_code_safety(code: &str, filename: &str) -> Vec<String> {
    dangerous_patterns()
        .iter()
        .filter(|(re, _)| re.is_match(code))
        .map(|(_, label)| format!("{}: {}", filename, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_repo_name() {
        assert_eq!(sanitize_repo_name("My Cool_App!!", 100).unwrap(), "my-cool-app");
        assert_eq!(sanitize_repo_name("--a--b--", 100).unwrap(), "a-b");
        assert_eq!(sanitize_repo_name("captcha-solver-a1b2c", 100).unwrap(), "captcha-solver-a1b2c");
        assert!(sanitize_repo_name("!!!", 100).is_err());
    }

    #[test]
    fn test_sanitize_repo_name_truncates() {
        let name = sanitize_repo_name("abcde-fghij", 6).unwrap();
        assert_eq!(name, "abcde");
    }

    #[test]
    fn test_is_valid_repo_name() {
        assert!(is_valid_repo_name("sum-of-sales-7f3a", 100));
        assert!(is_valid_repo_name("Counter_App", 100));
        assert!(is_valid_repo_name("site.v2", 100));
        assert!(is_valid_repo_name("CaptchaSolver-A1B2", 100));
        assert!(is_valid_repo_name("-leading", 100));
        assert!(!is_valid_repo_name("Has Spaces", 100));
        assert!(!is_valid_repo_name("owner/repo", 100));
        assert!(!is_valid_repo_name(".", 100));
        assert!(!is_valid_repo_name("..", 100));
        assert!(!is_valid_repo_name("", 100));
        assert!(!is_valid_repo_name("abcdef", 3));
    }

    #[test]
    fn test_sanitize_description() {
        let text = "Round 1:\tBuild a\n\n  counter\u{7}app\r\n";
        assert_eq!(sanitize_description(text, 100), "Round 1: Build a counterapp");
    }

    #[test]
    fn test_sanitize_description_caps_length() {
        let text = "x".repeat(500);
        assert_eq!(sanitize_description(&text, 100).len(), 100);
    }

    #[test]
    fn test_scan_code_safety() {
        let html = "<script>eval(userInput)</script>";
        let warnings = scan_code_safety(html, "index.html");
        assert_eq!(warnings, vec!["index.html: Use of eval()".to_string()]);

        assert!(scan_code_safety("<p>hello</p>", "index.html").is_empty());
    }
}
