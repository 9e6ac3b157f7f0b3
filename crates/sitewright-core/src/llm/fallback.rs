//! Local synthesis of the mandatory files
//!
//! Used to fill gaps in model output and, when every model fails, to build
//! the whole response without any remote call.

use super::parser::parse_files;
use super::prompts::MIT_LICENSE;
use super::provider::{GenerationRequest, GenerationResponse, INDEX_FILE, LICENSE_FILE, README_FILE};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

/// `model_used` of a response built entirely by local synthesis
pub const FALLBACK_MODEL: &str = "fallback";

/// Kind of element the heuristic renders for an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Button,
    Select,
    NumberInput,
    Output,
}

impl ElementKind {
    /// Classify an identifier by substring; first match wins
    pub fn classify(id: &str) -> Self {
        let id = id.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| id.contains(n));

        if has(&["button", "btn", "submit", "calculate"]) {
            ElementKind::Button
        } else if has(&["select", "picker", "filter", "dropdown"]) {
            ElementKind::Select
        } else if has(&["input", "num"]) {
            ElementKind::NumberInput
        } else {
            ElementKind::Output
        }
    }
}

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"#([A-Za-z0-9_-]+)").ok())
        .as_ref()
}

/// All `#identifier` tokens in the checks, de-duplicated and sorted
pub fn element_ids(checks: &[String]) -> Vec<String> {
    let Some(re) = id_pattern() else {
        return Vec::new();
    };
    checks
        .iter()
        .flat_map(|check| re.captures_iter(check))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn label_for(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_element(id: &str) -> String {
    let label = label_for(id);
    match ElementKind::classify(id) {
        ElementKind::Button => format!(
            r#"      <button id="{id}" class="btn btn-primary mb-2">{label}</button>"#
        ),
        ElementKind::Select => format!(
            r#"      <select id="{id}" class="form-select mb-2">
        <option value="">{label}</option>
      </select>"#
        ),
        ElementKind::NumberInput => format!(
            r#"      <input type="number" id="{id}" class="form-control mb-2" placeholder="{label}">"#
        ),
        ElementKind::Output => format!(
            r#"      <div class="mb-2"><label class="form-label">{label}</label> <output id="{id}">-</output></div>"#
        ),
    }
}

/// Minimal page containing one element per identifier found in the checks
pub fn fallback_html(brief: &str, checks: &[String]) -> String {
    let mut elements = String::new();
    for id in element_ids(checks) {
        let _ = writeln!(elements, "{}", render_element(&id));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Application</title>
  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
</head>
<body class="p-4">
  <main class="container">
    <h1 class="mb-3">Application</h1>
    <p class="lead">{brief}</p>
    <section class="mt-4">
{elements}    </section>
  </main>
  <script>
    document.querySelectorAll('button').forEach(function (btn) {{
      btn.addEventListener('click', function () {{ console.log('clicked', btn.id); }});
    }});
  </script>
</body>
</html>
"#,
        brief = escape_html(brief),
        elements = elements,
    )
}

/// Readme embedding the brief
pub fn fallback_readme(brief: &str) -> String {
    format!(
        "# Generated Application\n\n\
         ## Summary\n{brief}\n\n\
         ## Setup\nNo build step. Open `index.html` in a browser or visit the GitHub Pages site.\n\n\
         ## Code\n`index.html` holds the markup, styles and script. Bootstrap is loaded from a CDN.\n\n\
         ## License\nMIT, see `LICENSE`.\n"
    )
}

/// Whole response built locally, tagged with [`FALLBACK_MODEL`]
pub fn fallback_response(request: &GenerationRequest, elapsed: Duration) -> GenerationResponse {
    GenerationResponse {
        index_html: fallback_html(&request.brief, &request.checks),
        readme_md: fallback_readme(&request.brief),
        license_text: MIT_LICENSE.to_string(),
        additional_files: BTreeMap::new(),
        model_used: FALLBACK_MODEL.to_string(),
        generation_time: elapsed,
    }
}

/// Parse model output and fill any missing mandatory file locally
pub fn complete_response(
    content: &str,
    request: &GenerationRequest,
    model: &str,
    elapsed: Duration,
) -> GenerationResponse {
    let mut files = parse_files(content);

    let index_html = files.remove(INDEX_FILE).unwrap_or_else(|| {
        warn!(model, "model output has no index.html, synthesising one");
        fallback_html(&request.brief, &request.checks)
    });
    let readme_md = files
        .remove(README_FILE)
        .unwrap_or_else(|| fallback_readme(&request.brief));
    let license_text = files
        .remove(LICENSE_FILE)
        .unwrap_or_else(|| MIT_LICENSE.to_string());

    GenerationResponse {
        index_html,
        readme_md,
        license_text,
        additional_files: files,
        model_used: model.to_string(),
        generation_time: elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn checks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(ElementKind::classify("count-btn"), ElementKind::Button);
        assert_eq!(ElementKind::classify("submit"), ElementKind::Button);
        assert_eq!(ElementKind::classify("calculate-total"), ElementKind::Button);
        assert_eq!(ElementKind::classify("region-filter"), ElementKind::Select);
        assert_eq!(ElementKind::classify("currency-picker"), ElementKind::Select);
        assert_eq!(ElementKind::classify("num-a"), ElementKind::NumberInput);
        assert_eq!(ElementKind::classify("user-input"), ElementKind::NumberInput);
        assert_eq!(ElementKind::classify("total-sales"), ElementKind::Output);
        // first rule wins
        assert_eq!(ElementKind::classify("input-submit"), ElementKind::Button);
    }

    #[test]
    fn test_element_ids_sorted_unique() {
        let ids = element_ids(&checks(&[
            "#b-out shows #a_in",
            "Clicking #b-out again",
            "no ids here",
        ]));
        assert_eq!(ids, vec!["a_in", "b-out"]);
    }

    #[test]
    fn test_fallback_html_renders_button() {
        let html = fallback_html("Counter", &checks(&["#count-btn increments #count"]));
        assert!(html.contains(r#"<button id="count-btn""#));
        assert!(html.contains(r#"<output id="count">"#));
        assert!(html.contains("Count Btn"));
    }

    #[test]
    fn test_brief_is_escaped() {
        let html = fallback_html("<script>alert('x')</script> & more", &[]);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }

    #[test]
    fn test_complete_response_fills_missing_files() {
        let request = GenerationRequest {
            brief: "Counter".into(),
            checks: checks(&["#count-btn"]),
            ..Default::default()
        };
        let response = complete_response(
            "=== README.md ===\n# Counter\n=== app.js ===\nlet n = 0;",
            &request,
            "some-model",
            Duration::ZERO,
        );

        assert!(response.index_html.contains("count-btn"));
        assert_eq!(response.readme_md, "# Counter");
        assert_eq!(response.license_text, MIT_LICENSE);
        assert_eq!(response.additional_files["app.js"], "let n = 0;");
        assert_eq!(response.model_used, "some-model");
    }

    #[test]
    fn test_mandatory_files_always_present() {
        let request = GenerationRequest::default();
        for content in ["", "prose only", "=== LICENSE ===\n", "=== index.html ===\n<p/>"] {
            let files = complete_response(content, &request, "m", Duration::ZERO).files();
            for name in super::super::provider::MANDATORY_FILES {
                assert!(!files[name].is_empty(), "{} empty for {:?}", name, content);
            }
        }
    }

    #[test]
    fn test_fallback_response_tagged() {
        let response = fallback_response(&GenerationRequest::default(), Duration::ZERO);
        assert!(response.is_fallback());
        assert!(response.additional_files.is_empty());
    }
}
