//! Workspace layouts for common test scenarios.
//!
//! Each layout is a list of `(path, content)` pairs relative to a bucket
//! root. The remote modules they depend on are served by
//! [`remote_provider`].

use crate::sources::MemProvider;

pub const GOOGLEAPIS: &str = "buf.build/googleapis/googleapis";
pub const EXTRA: &str = "buf.build/acme/extra";
pub const UNUSED: &str = "buf.build/acme/unused";

/// A `.proto` file declaring `package` and importing `imports`.
pub fn proto(package: &str, imports: &[&str]) -> String {
    let mut content = String::from("syntax = \"proto3\";\n\n");
    content.push_str(&format!("package {};\n", package));
    if !imports.is_empty() {
        content.push('\n');
        for import in imports {
            content.push_str(&format!("import \"{}\";\n", import));
        }
    }
    content
}

/// Remote modules referenced by the layouts below.
pub fn remote_provider() -> MemProvider {
    let mut provider = MemProvider::new();
    provider
        .add_module(
            GOOGLEAPIS,
            "c1",
            vec![("google/type/date.proto", proto("google.type", &[]))],
        )
        .unwrap();
    provider
        .add_module(
            EXTRA,
            "e1",
            vec![("acme/extra/v1/extra.proto", proto("acme.extra.v1", &[]))],
        )
        .unwrap();
    provider
        .add_module(
            UNUSED,
            "u1",
            vec![("unused/v1/unused.proto", proto("unused.v1", &[]))],
        )
        .unwrap();
    provider
}

/// A `v2` workspace with modules `a` and `b`, where `b` imports `a` and
/// `a` imports googleapis. The unused dependency is declared and locked
/// but never imported.
pub fn v2_workspace() -> Vec<(&'static str, String)> {
    vec![
        (
            "buf.yaml",
            "version: v2\n\
             modules:\n  \
               - path: a\n    \
                 name: buf.build/acme/a\n  \
               - path: b\n    \
                 name: buf.build/acme/b\n    \
                 lint:\n      \
                   use:\n        \
                     - STANDARD\n\
             deps:\n  \
               - buf.build/googleapis/googleapis\n  \
               - buf.build/acme/unused\n"
                .to_string(),
        ),
        (
            "buf.lock",
            "version: v2\n\
             deps:\n  \
               - name: buf.build/googleapis/googleapis\n    \
                 commit: c1\n  \
               - name: buf.build/acme/unused\n    \
                 commit: u1\n"
                .to_string(),
        ),
        ("README.md", "# Workspace\n".to_string()),
        ("LICENSE", "Apache-2.0\n".to_string()),
        ("a/buf.md", "# Module a\n".to_string()),
        (
            "a/acme/a/v1/a.proto",
            proto("acme.a.v1", &["google/type/date.proto"]),
        ),
        ("b/acme/b/v1/b.proto", proto("acme.b.v1", &["acme/a/v1/a.proto"])),
    ]
}

/// A `buf.work.yaml` workspace listing `proto` and `enterprise/proto`.
pub fn legacy_workspace() -> Vec<(&'static str, String)> {
    vec![
        (
            "buf.work.yaml",
            "version: v1\n\
             directories:\n  \
               - proto\n  \
               - enterprise/proto\n"
                .to_string(),
        ),
        (
            "proto/buf.yaml",
            "version: v1\n\
             name: buf.build/acme/proto\n\
             deps:\n  \
               - buf.build/acme/extra\n"
                .to_string(),
        ),
        (
            "proto/buf.lock",
            "version: v1\n\
             deps:\n  \
               - remote: buf.build\n    \
                 owner: acme\n    \
                 repository: extra\n    \
                 commit: e1\n"
                .to_string(),
        ),
        ("proto/foo.proto", proto("foo", &["acme/extra/v1/extra.proto"])),
        ("proto/acme/v1/bar.proto", proto("acme.v1", &[])),
        (
            "enterprise/proto/buf.yaml",
            "version: v1\nname: buf.build/acme/enterprise\n".to_string(),
        ),
        ("enterprise/proto/ent/v1/ent.proto", proto("ent.v1", &["foo.proto"])),
    ]
}

/// A lone `v1` module at `proto` with no workspace file.
pub fn v1_module() -> Vec<(&'static str, String)> {
    vec![
        (
            "proto/buf.yaml",
            "version: v1\nname: buf.build/acme/single\n".to_string(),
        ),
        ("proto/acme/v1/a.proto", proto("acme.v1", &[])),
        ("proto/acme/v1/b.proto", proto("acme.v1", &["acme/v1/a.proto"])),
        ("proto/other/v1/c.proto", proto("other.v1", &[])),
    ]
}

/// A `v1beta1` module at `mod` with roots `root1` and `root2`.
pub fn roots_module() -> Vec<(&'static str, String)> {
    vec![
        (
            "mod/buf.yaml",
            "version: v1beta1\n\
             build:\n  \
               roots:\n    \
                 - root1\n    \
                 - root2\n"
                .to_string(),
        ),
        ("mod/root1/pkg/file.proto", proto("pkg", &[])),
        ("mod/root2/other/other.proto", proto("other", &["pkg/file.proto"])),
        ("mod/root3/pkg/file.proto", proto("pkg", &[])),
    ]
}

/// Two include directories for protoc-style resolution.
pub fn protoc_layout() -> Vec<(&'static str, String)> {
    vec![
        ("include1/a/a.proto", proto("a", &[])),
        ("include2/b/b.proto", proto("b", &["a/a.proto"])),
        ("include2/b/c.proto", proto("b", &[])),
        ("include2/notes.txt", "not a proto file\n".to_string()),
    ]
}
