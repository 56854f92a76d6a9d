//! Toolchains turn unit sources into class images
//!
//! The engine only talks to the [`Toolchain`] trait. [`EmbeddedToolchain`]
//! is the one shipped with this crate: parse, check, then wrap every class
//! declaration in a [`ClassImage`] under the unit's declared namespace.

use crate::compiler::{check_units, parse_source, CheckInput, Diagnostic};
use crate::runtime::ClassImage;
use autograde_config::EMBEDDED_TOOLCHAIN;
use std::path::PathBuf;
use tracing::{debug, trace};

/// One unit handed to a toolchain
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainSource {
    /// File name used in diagnostics (`Calc.java`)
    pub origin: String,
    pub text: String,
    /// Where the text was staged on disk, for toolchains that read files
    pub staged_path: Option<PathBuf>,
}

impl ToolchainSource {
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
            staged_path: None,
        }
    }
}

/// Successful compilation: the class images plus any warnings
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainOutput {
    pub classes: Vec<ClassImage>,
    pub warnings: Vec<Diagnostic>,
}

pub trait Toolchain: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Whether sources must be written to disk before `compile`
    fn requires_staging(&self) -> bool {
        false
    }

    /// Compile all `sources` together; `Err` carries every error diagnostic
    fn compile(
        &self,
        sources: &[ToolchainSource],
        args: &[String],
    ) -> Result<ToolchainOutput, Vec<Diagnostic>>;
}

/// Options understood by the embedded toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Options {
    line_numbers: bool,
    warnings: bool,
    warnings_are_errors: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            line_numbers: true,
            warnings: true,
            warnings_are_errors: false,
        }
    }
}

/// The `javalite` toolchain: parser and checker of this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedToolchain;

impl EmbeddedToolchain {
    pub fn new() -> Self {
        Self
    }

    fn parse_args(&self, args: &[String]) -> Result<Options, Vec<Diagnostic>> {
        let mut options = Options::default();
        let mut words = args.iter().flat_map(|arg| arg.split_whitespace());
        while let Some(word) = words.next() {
            match word {
                "-g" => options.line_numbers = true,
                "-g:none" => options.line_numbers = false,
                "-nowarn" => options.warnings = false,
                "-Werror" => options.warnings_are_errors = true,
                "-encoding" => match words.next() {
                    Some(encoding) if encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8") => {}
                    Some(encoding) => {
                        return Err(vec![self.flag_error(format!("unsupported encoding: {encoding}"))])
                    }
                    None => return Err(vec![self.flag_error("-encoding requires an argument")]),
                },
                other => return Err(vec![self.flag_error(format!("invalid flag: {other}"))]),
            }
        }
        Ok(options)
    }

    fn flag_error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(EMBEDDED_TOOLCHAIN, None, message)
    }
}

impl Toolchain for EmbeddedToolchain {
    fn name(&self) -> &str {
        EMBEDDED_TOOLCHAIN
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn compile(
        &self,
        sources: &[ToolchainSource],
        args: &[String],
    ) -> Result<ToolchainOutput, Vec<Diagnostic>> {
        let options = self.parse_args(args)?;

        let mut units = Vec::with_capacity(sources.len());
        let mut errors = Vec::new();
        for source in sources {
            match parse_source(&source.text) {
                Ok(unit) => units.push((source, unit)),
                Err(err) => errors.push(Diagnostic::from_parser_error(&source.origin, &err)),
            }
        }
        if !errors.is_empty() {
            debug!(target: "autograde::compiler", errors = errors.len(), "syntax errors");
            return Err(errors);
        }

        let inputs: Vec<CheckInput<'_>> = units
            .iter()
            .map(|(source, unit)| CheckInput {
                origin: &source.origin,
                unit,
            })
            .collect();
        let (mut errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
            check_units(&inputs).into_iter().partition(Diagnostic::is_error);
        let warnings = if !options.warnings {
            Vec::new()
        } else if options.warnings_are_errors {
            if !warnings.is_empty() {
                errors.extend(warnings.into_iter().map(Diagnostic::promoted));
                errors.push(self.flag_error("warnings found and -Werror specified"));
            }
            Vec::new()
        } else {
            warnings
        };
        if !errors.is_empty() {
            debug!(target: "autograde::compiler", errors = errors.len(), "semantic errors");
            return Err(errors);
        }

        let mut classes = Vec::new();
        for (source, unit) in units {
            let namespace = unit.package.clone().unwrap_or_default();
            for decl in unit.classes {
                trace!(
                    target: "autograde::compiler",
                    class = %decl.name,
                    namespace = %namespace,
                    "class image"
                );
                classes.push(ClassImage::new(decl, &namespace, &source.origin, options.line_numbers));
            }
        }
        Ok(ToolchainOutput { classes, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compile_produces_qualified_images() {
        let source = ToolchainSource::new(
            "Calc.java",
            "package hw;\npublic class Calc { int add(int a, int b) { return a + b; } }\nclass Helper {}",
        );
        let output = EmbeddedToolchain.compile(&[source], &[]).expect("compile");
        let names: Vec<&str> = output.classes.iter().map(|c| c.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["hw.Calc", "hw.Helper"]);
        assert!(output.classes.iter().all(|c| c.line_numbers));
    }

    #[test]
    fn test_syntax_error_reports_origin() {
        let source = ToolchainSource::new("Bad.java", "public class Bad { int x = ; }");
        let errors = EmbeddedToolchain.compile(&[source], &[]).expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("Bad.java:1:"), "{}", errors[0]);
    }

    #[test]
    fn test_flags() {
        let source = ToolchainSource::new("A.java", "class A { }");
        let output = EmbeddedToolchain
            .compile(std::slice::from_ref(&source), &args(&["-g:none", "-encoding UTF-8"]))
            .expect("compile");
        assert!(!output.classes[0].line_numbers);

        let errors = EmbeddedToolchain
            .compile(&[source], &args(&["-O3"]))
            .expect_err("invalid flag");
        assert_eq!(errors[0].message, "invalid flag: -O3");
    }

    #[test]
    fn test_warning_handling() {
        let text = "class A { int x; void f() { int x = 1; } }";
        let source = ToolchainSource::new("A.java", text);

        let output = EmbeddedToolchain.compile(std::slice::from_ref(&source), &[]).expect("compile");
        assert_eq!(output.warnings.len(), 1);

        let output = EmbeddedToolchain
            .compile(std::slice::from_ref(&source), &args(&["-nowarn"]))
            .expect("compile");
        assert!(output.warnings.is_empty());

        let errors = EmbeddedToolchain
            .compile(&[source], &args(&["-Werror"]))
            .expect_err("promoted");
        assert!(errors.iter().all(Diagnostic::is_error));
        assert!(errors[0].message.contains("[shadow]"));
    }

    #[test]
    fn test_duplicate_class_across_units() {
        let a = ToolchainSource::new("A.java", "class Shared {}");
        let b = ToolchainSource::new("B.java", "class Shared {}");
        let errors = EmbeddedToolchain.compile(&[a, b], &[]).expect_err("duplicate");
        assert_eq!(errors[0].to_string(), "B.java:1:1: error: duplicate class: Shared");
    }
}
