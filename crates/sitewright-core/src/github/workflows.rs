//! Workflow templates committed to every new repository

use std::collections::BTreeMap;

pub const PAGES_WORKFLOW_PATH: &str = ".github/workflows/pages.yml";
pub const CI_WORKFLOW_PATH: &str = ".github/workflows/ci.yml";

/// Deploys the repository root to GitHub Pages on every push to main
pub const PAGES_WORKFLOW: &str = r#"name: Deploy to GitHub Pages

on:
  push:
    branches: [main]
  workflow_dispatch:

permissions:
  contents: read
  pages: write
  id-token: write

concurrency:
  group: pages
  cancel-in-progress: false

jobs:
  deploy:
    runs-on: ubuntu-latest
    environment:
      name: github-pages
      url: ${{ steps.deployment.outputs.page_url }}
    steps:
      - uses: actions/checkout@v4
      - uses: actions/configure-pages@v4
      - uses: actions/upload-pages-artifact@v3
        with:
          path: '.'
      - id: deployment
        uses: actions/deploy-pages@v4
"#;

/// Checks the mandatory files are present and the license is MIT
pub const CI_WORKFLOW: &str = r#"name: Validate site

on:
  push:
    branches: [main]
  pull_request:
    branches: [main]

jobs:
  validate:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Required files
        run: |
          for f in index.html README.md LICENSE; do
            test -f "$f" || { echo "missing $f"; exit 1; }
          done
      - name: License
        run: grep -q "MIT License" LICENSE
      - name: Markup
        run: |
          grep -q "<html" index.html || { echo "index.html has no <html> element"; exit 1; }
          grep -q "<!DOCTYPE html>" index.html || echo "warning: no doctype"
"#;

/// All templates keyed by repository path
pub fn all_workflows() -> BTreeMap<String, String> {
    BTreeMap::from([
        (PAGES_WORKFLOW_PATH.to_string(), PAGES_WORKFLOW.to_string()),
        (CI_WORKFLOW_PATH.to_string(), CI_WORKFLOW.to_string()),
    ])
}
