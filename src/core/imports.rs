//! Lightweight `.proto` scanning.
//!
//! Only the `import` and `package` statements are needed to build the
//! module graph and to expand package targets, so files are scanned with
//! regular expressions after comments are stripped rather than parsed.

use std::sync::LazyLock;

use regex::Regex;

/// What a scan of one `.proto` file found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtoFileInfo {
    /// Imported paths in declaration order
    pub imports: Vec<String>,
    /// Declared package, if any
    pub package: Option<String>,
}

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s+(?:(?:public|weak)\s+)?"([^"]+)"\s*;"#)
        .unwrap_or_else(|e| panic!("invalid import regex: {e}"))
});

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpackage\s+([A-Za-z_][A-Za-z0-9_.]*)\s*;")
        .unwrap_or_else(|e| panic!("invalid package regex: {e}"))
});

/// Remove `//` and `/* */` comments, leaving string literals intact.
pub fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Scan a `.proto` file's text.
pub fn scan(content: &str) -> ProtoFileInfo {
    let stripped = strip_comments(content);
    let imports = IMPORT_RE
        .captures_iter(&stripped)
        .map(|caps| caps[1].to_string())
        .collect();
    let package = PACKAGE_RE
        .captures(&stripped)
        .map(|caps| caps[1].to_string());
    ProtoFileInfo { imports, package }
}

/// Scan raw bytes, replacing invalid UTF-8.
pub fn scan_bytes(data: &[u8]) -> ProtoFileInfo {
    scan(&String::from_utf8_lossy(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_imports_and_package() {
        let content = r#"
syntax = "proto3";

package acme.weather.v1;

import "google/type/date.proto";
import public "acme/common/v1/common.proto";
import weak "acme/legacy.proto";
// import "commented/out.proto";
/* import "also/commented.proto"; */

message Forecast {
  string note = 1 [json_name = "import \"x.proto\";"];
}
"#;
        let info = scan(content);
        assert_eq!(info.package.as_deref(), Some("acme.weather.v1"));
        assert_eq!(
            info.imports,
            vec![
                "google/type/date.proto",
                "acme/common/v1/common.proto",
                "acme/legacy.proto",
            ]
        );
    }

    #[test]
    fn test_no_package() {
        let info = scan("syntax = \"proto2\";\nmessage A {}\n");
        assert!(info.package.is_none());
        assert!(info.imports.is_empty());
    }

    #[test]
    fn test_strip_comments_keeps_lines() {
        let stripped = strip_comments("a // b\n/* c\nd */ e");
        assert_eq!(stripped.lines().count(), 3);
        assert!(stripped.contains('e'));
        assert!(!stripped.contains('b'));
    }
}
