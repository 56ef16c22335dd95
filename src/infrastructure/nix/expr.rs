//! Minimal Nix expression writer.
//!
//! Just enough of the language to render a `pkgs.mkShell` call from a
//! [`ShellSpec`]: strings, lists, attribute sets, `let`/`in`, `with`,
//! and raw fragments for identifiers and interpolations.

use std::fmt::Write as _;

use crate::domain::models::ShellSpec;

/// A Nix value to be serialized.
#[derive(Debug, Clone)]
pub enum NixValue {
    Bool(bool),
    Str(String),
    /// Emitted verbatim (identifiers, interpolated strings).
    Raw(String),
    List(Vec<NixValue>),
    Attrs(Vec<(String, NixValue)>),
    With {
        var: String,
        body: Box<NixValue>,
    },
    Let {
        bindings: Vec<(String, NixValue)>,
        body: Box<NixValue>,
    },
    Call {
        func: String,
        args: Vec<NixValue>,
    },
}

impl NixValue {
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Serialize to Nix source text.
    pub fn dumps(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, false);
        out
    }

    fn write(&self, out: &mut String, parenthesize: bool) {
        match self {
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Str(s) => {
                // Multi-line or quote-bearing strings use the indented
                // string form, everything else plain quotes.
                if s.contains('\n') || s.contains('"') {
                    let _ = write!(out, "''{s}''");
                } else {
                    let _ = write!(out, "\"{s}\"");
                }
            }
            Self::Raw(r) => out.push_str(r),
            Self::List(items) => {
                out.push_str("[ ");
                for item in items {
                    item.write(out, true);
                    out.push(' ');
                }
                out.push(']');
            }
            Self::Attrs(entries) => {
                out.push_str("{ ");
                for (key, value) in entries {
                    let _ = write!(out, "{key} = ");
                    value.write(out, false);
                    out.push_str("; ");
                }
                out.push('}');
            }
            Self::With { var, body } => {
                let needs_parens = parenthesize;
                if needs_parens {
                    out.push('(');
                }
                let _ = write!(out, "with {var}; ");
                body.write(out, false);
                if needs_parens {
                    out.push(')');
                }
            }
            Self::Let { bindings, body } => {
                out.push_str("let\n");
                for (name, value) in bindings {
                    let _ = write!(out, "  {name} = ");
                    value.write(out, false);
                    out.push_str(";\n");
                }
                out.push_str("in ");
                body.write(out, false);
            }
            Self::Call { func, args } => {
                if parenthesize {
                    out.push('(');
                }
                out.push_str(func);
                for arg in args {
                    out.push(' ');
                    arg.write(out, true);
                }
                if parenthesize {
                    out.push(')');
                }
            }
        }
    }
}

/// Render `[ pkg1 pkg2 ... ]` with the `pkgs` scope in force.
fn with_pkgs(packages: &[String]) -> NixValue {
    NixValue::With {
        var: "pkgs".to_string(),
        body: Box::new(NixValue::List(
            packages.iter().map(NixValue::raw).collect(),
        )),
    }
}

/// Render the `mkShell` expression for a generated spec.
///
/// Library-path packages are resolved through
/// `pkgs.lib.makeLibraryPath`, preserving caller order, and exported
/// onto `LD_LIBRARY_PATH` from the shell hook.
pub fn mk_shell_expr(spec: &ShellSpec, nixpkgs_ref: &str) -> String {
    let mut hook_lines: Vec<String> = Vec::new();
    if let Some(hook) = &spec.shell_hook {
        hook_lines.push(hook.clone());
    }
    if !spec.library_paths.is_empty() {
        let paths = NixValue::With {
            var: "pkgs".to_string(),
            body: Box::new(NixValue::List(
                spec.library_paths.iter().map(NixValue::raw).collect(),
            )),
        };
        hook_lines.push(format!(
            "export LD_LIBRARY_PATH=\"${{pkgs.lib.makeLibraryPath ({})}}:$LD_LIBRARY_PATH\"",
            paths.dumps()
        ));
    }

    let mut shell_attrs = vec![("packages".to_string(), with_pkgs(&spec.packages))];
    if !hook_lines.is_empty() {
        shell_attrs.push((
            "shellHook".to_string(),
            NixValue::str(hook_lines.join("\n")),
        ));
    }

    NixValue::Let {
        bindings: vec![
            (
                "nixpkgs".to_string(),
                NixValue::Call {
                    func: "builtins.getFlake".to_string(),
                    args: vec![NixValue::str(nixpkgs_ref)],
                },
            ),
            (
                "pkgs".to_string(),
                NixValue::Call {
                    func: "import".to_string(),
                    args: vec![NixValue::raw("nixpkgs"), NixValue::Attrs(vec![])],
                },
            ),
        ],
        body: Box::new(NixValue::Call {
            func: "pkgs.mkShell".to_string(),
            args: vec![NixValue::Attrs(shell_attrs)],
        }),
    }
    .dumps()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_scalars_and_lists() {
        assert_eq!(NixValue::Bool(true).dumps(), "true");
        assert_eq!(NixValue::str("hi").dumps(), "\"hi\"");
        assert_eq!(NixValue::str("a\nb").dumps(), "''a\nb''");
        let list = NixValue::List(vec![NixValue::raw("curl"), NixValue::raw("jq")]);
        assert_eq!(list.dumps(), "[ curl jq ]");
    }

    #[test]
    fn calls_parenthesize_nested_arguments() {
        let expr = NixValue::Call {
            func: "import".to_string(),
            args: vec![
                NixValue::raw("nixpkgs"),
                NixValue::Call {
                    func: "f".to_string(),
                    args: vec![NixValue::raw("x")],
                },
            ],
        };
        assert_eq!(expr.dumps(), "import nixpkgs (f x)");
    }

    #[test]
    fn mk_shell_lists_packages_in_scope() {
        let spec = ShellSpec::mk_shell(["curl", "jq"]);
        let expr = mk_shell_expr(&spec, "github:NixOS/nixpkgs/nixos-unstable");
        assert!(expr.contains("pkgs.mkShell"));
        assert!(expr.contains("packages = with pkgs; [ curl jq ]"));
        assert!(expr.contains("builtins.getFlake \"github:NixOS/nixpkgs/nixos-unstable\""));
    }

    #[test]
    fn library_paths_become_a_hook_export() {
        let spec = ShellSpec::mk_shell(["python3"]).with_library_paths(["zlib", "openssl"]);
        let expr = mk_shell_expr(&spec, "github:NixOS/nixpkgs/nixos-unstable");
        assert!(expr.contains("pkgs.lib.makeLibraryPath"));
        assert!(expr.contains("zlib openssl"));
        assert!(expr.contains(":$LD_LIBRARY_PATH"));
    }

    #[test]
    fn custom_hook_precedes_library_path_export() {
        let spec = ShellSpec::mk_shell(["python3"])
            .with_shell_hook("echo ready")
            .with_library_paths(["zlib"]);
        let expr = mk_shell_expr(&spec, "github:NixOS/nixpkgs/nixos-unstable");
        let hook_pos = expr.find("echo ready").unwrap();
        let export_pos = expr.find("LD_LIBRARY_PATH").unwrap();
        assert!(hook_pos < export_pos);
    }
}
