//! Common test utilities

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Config that swaps every external tool for a small shell command
pub const FAKE_TOOLS: &str = r#"
tools:
  lint-scripts: "echo checked ${files}"
  lint-styles: "echo checked ${files}"
  bundle-production: "tr -d ' \n' < ${entry} > ${output}"
  bundle-development: "cp ${entry} ${output} && printf '{}' > ${output}.map"
  style-stages:
    - "tr -d ' \n'"
    - "cat"
  optimize-image: "echo ${file} >> optimized.log"
  minify-html: "tr -s ' \n' ' ' < ${input} > ${output}"
server:
  open: false
"#;

/// Create a temporary project holding sources and the given brisk.yml
pub fn create_project(config: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(root, "brisk.yml", config);
    write(root, "scripts/main.js", "console.log( 'hi' );\n");
    write(root, "styles/main.css", "body {\n  color: red;\n}\n");
    write(root, "images/logo.png", "png");
    write(root, "index-src.html", "<html>\n  <body>hi</body>\n</html>\n");
    write(root, "dist/stale.txt", "old");

    temp_dir
}

/// Project using the fake tools
pub fn create_fake_project() -> TempDir {
    create_project(FAKE_TOOLS)
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}
