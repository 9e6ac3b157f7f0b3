//! Prompt construction for static-site generation

use super::provider::GenerationRequest;
use std::fmt::Write;

/// Longest excerpt of the previous round's markup embedded in a prompt
pub const EXISTING_CODE_EXCERPT_CHARS: usize = 3000;

/// Fixed license text committed with every site
pub const MIT_LICENSE: &str = r#"MIT License

Copyright (c) 2025

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE."#;

/// System instruction fixing the output contract
pub fn system_prompt() -> &'static str {
    "You are a front-end engineer who builds small static web applications.\n\
     Reply with exactly these files and nothing else: index.html, README.md, LICENSE.\n\
     Start every file with a marker line of the form `=== filename ===`.\n\
     index.html must be self-contained HTML with inline CSS and JavaScript.\n\
     Never emit server-side code. Load third-party libraries from a CDN.\n\
     Do not write prose outside the file markers."
}

/// User instruction for a generation request
pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();

    let existing = request
        .existing_code
        .as_deref()
        .filter(|code| request.round > 1 && !code.is_empty());

    if existing.is_some() {
        let _ = writeln!(prompt, "Update an existing static web application.\n");
        let _ = writeln!(prompt, "CHANGE REQUEST:\n{}", request.brief);
    } else {
        let _ = writeln!(prompt, "Build a static web application.\n");
        let _ = writeln!(prompt, "BRIEF:\n{}", request.brief);
    }

    if !request.checks.is_empty() {
        let _ = writeln!(prompt, "\nTHE PAGE WILL BE EVALUATED AGAINST THESE CHECKS:");
        for (i, check) in request.checks.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, check);
        }
        let _ = writeln!(
            prompt,
            "Every element id referenced by a check must exist and behave as described."
        );
    }

    if !request.attachments.is_empty() {
        let _ = writeln!(prompt, "\nATTACHMENTS (committed next to index.html):");
        for attachment in &request.attachments {
            let _ = writeln!(prompt, "- {} ({})", attachment.name, attachment.mime_type());
        }
    }

    if let Some(code) = existing {
        let excerpt: String = code.chars().take(EXISTING_CODE_EXCERPT_CHARS).collect();
        let _ = writeln!(prompt, "\nCURRENT index.html:\n```html\n{}", excerpt);
        if code.chars().count() > EXISTING_CODE_EXCERPT_CHARS {
            let _ = writeln!(prompt, "... (truncated)");
        }
        let _ = writeln!(prompt, "```");
        let _ = writeln!(
            prompt,
            "\nKeep everything that already works. Change only what the request requires \
             and describe the changes in README.md."
        );
    }

    let _ = writeln!(
        prompt,
        "\nOUTPUT:\n=== index.html ===\n<complete page>\n\n=== README.md ===\n\
         <summary, setup, usage, code explanation, license>\n\n=== LICENSE ===\n<MIT license text>"
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attachment;

    fn request(round: u8, existing: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            brief: "Sum the sales column".to_string(),
            checks: vec!["#total shows the sum".to_string(), "page has a title".to_string()],
            attachments: vec![Attachment::new("data.csv", "data:text/csv;base64,YQ==")],
            round,
            existing_code: existing.map(String::from),
        }
    }

    #[test]
    fn test_first_round_prompt() {
        let prompt = user_prompt(&request(1, None));
        assert!(prompt.contains("BRIEF:\nSum the sales column"));
        assert!(prompt.contains("1. #total shows the sum"));
        assert!(prompt.contains("2. page has a title"));
        assert!(prompt.contains("- data.csv (text/csv)"));
        assert!(!prompt.contains("CURRENT index.html"));
    }

    #[test]
    fn test_revision_prompt_embeds_truncated_code() {
        let code = "x".repeat(EXISTING_CODE_EXCERPT_CHARS + 10);
        let prompt = user_prompt(&request(2, Some(&code)));
        assert!(prompt.contains("CHANGE REQUEST:"));
        assert!(prompt.contains("... (truncated)"));
        assert!(prompt.contains(&"x".repeat(EXISTING_CODE_EXCERPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(EXISTING_CODE_EXCERPT_CHARS + 1)));
    }

    #[test]
    fn test_revision_without_code_is_a_fresh_build() {
        let prompt = user_prompt(&request(2, Some("")));
        assert!(prompt.contains("BRIEF:"));
        assert!(!prompt.contains("CURRENT index.html"));
    }

    #[test]
    fn test_license_is_mit() {
        assert!(MIT_LICENSE.starts_with("MIT License"));
    }
}
