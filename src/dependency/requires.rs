//! `#Requires` directive scanning
//!
//! Script sources declare what they need with lines such as
//!
//! ```text
//! #Requires -Version 7.2
//! #Requires -PSEdition Core
//! #Requires -Modules Pester, @{ ModuleName = 'Az.Accounts'; ModuleVersion = '2.0' }
//! ```
//!
//! [`scan`] folds over every file and produces the raw declarations in file
//! and line order, the highest required host version and the union of the
//! required editions. Merging happens afterwards in [`super::merge`].

use crate::domain::{BoundVersion, DeclKind, Edition, RawDeclaration};
use crate::error::RequiresError;
use crate::manifest::{declaration_from_value, parse_value, DataValue};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static REQUIRES_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#requires\s+(.+?)\s*$").expect("valid regex"));

/// Everything collected from the `#Requires` lines of a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiresScan {
    /// Module declarations in file and line order
    pub declarations: Vec<RawDeclaration>,
    /// Highest `-Version` found
    pub minimum_host_version: Option<BoundVersion>,
    /// Editions named by `-PSEdition`, sorted and unique
    pub editions: Vec<Edition>,
}

impl RequiresScan {
    /// Declaration kinds only, for merging
    pub fn kinds(&self) -> impl Iterator<Item = &DeclKind> {
        self.declarations.iter().map(|d| &d.kind)
    }

    fn add_version(&mut self, version: BoundVersion) {
        let higher = match &self.minimum_host_version {
            Some(current) => version.cmp_canonical(current).is_gt(),
            None => true,
        };
        if higher {
            self.minimum_host_version = Some(version);
        }
    }

    fn add_edition(&mut self, edition: Edition) {
        if !self.editions.contains(&edition) {
            self.editions.push(edition);
            self.editions.sort();
        }
    }
}

/// Scan `(path, content)` pairs for `#Requires` directives
pub fn scan<'a, I>(files: I) -> Result<RequiresScan, RequiresError>
where
    I: IntoIterator<Item = (&'a Path, &'a str)>,
{
    files
        .into_iter()
        .try_fold(RequiresScan::default(), |acc, (path, content)| {
            scan_file(acc, path, content)
        })
}

fn scan_file(
    mut acc: RequiresScan,
    path: &Path,
    content: &str,
) -> Result<RequiresScan, RequiresError> {
    for (index, line) in content.lines().enumerate() {
        let Some(captures) = REQUIRES_LINE.captures(line) else {
            continue;
        };
        let line_no = index + 1;
        let error = |message: String| RequiresError {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };

        for (parameter, value) in split_parameters(&captures[1]).map_err(error)? {
            match parameter.to_ascii_lowercase().as_str() {
                "modules" | "module" => {
                    if value.is_empty() {
                        return Err(error("-Modules needs at least one module".to_string()));
                    }
                    for item in split_top_level(&value, ',') {
                        let kind = module_declaration(&item).map_err(error)?;
                        acc.declarations
                            .push(RawDeclaration::new(kind).at(path, line_no));
                    }
                }
                "version" => {
                    let version = BoundVersion::parse(&value).map_err(|e| error(e.to_string()))?;
                    acc.add_version(version);
                }
                "psedition" => {
                    let edition = Edition::parse(&value)
                        .ok_or_else(|| error(format!("unknown edition '{}'", value)))?;
                    acc.add_edition(edition);
                }
                // -RunAsAdministrator, -ShellId, -PSSnapin
                _ => {}
            }
        }
    }
    Ok(acc)
}

/// Split `-Name value -Other value` at top level
fn split_parameters(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut parameters: Vec<(String, String)> = Vec::new();
    for token in split_top_level(text, ' ') {
        match token.strip_prefix('-') {
            Some(name) if name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => {
                parameters.push((name.to_string(), String::new()));
            }
            _ => match parameters.last_mut() {
                Some((_, value)) => {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(&token);
                }
                None => return Err(format!("expected a parameter, found '{}'", token)),
            },
        }
    }
    Ok(parameters)
}

/// Split on `separator` outside quotes, `@{ }`, `@( )` and `( )`
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            current.push(c);
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '{' | '(' => {
                depth += 1;
                current.push(c);
            }
            '}' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if depth == 0 && (c == separator || (separator == ' ' && c.is_whitespace())) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn module_declaration(item: &str) -> Result<DeclKind, String> {
    let item = item.trim();
    if item.starts_with('@') || item.starts_with('\'') || item.starts_with('"') {
        let value = parse_value(item).map_err(|e| e.to_string())?;
        return match value {
            DataValue::String(name) if name.trim().is_empty() => {
                Err("empty module name".to_string())
            }
            other => declaration_from_value(&other).map_err(|e| e.to_string()),
        };
    }
    Ok(DeclKind::name(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyBounds;
    use std::path::PathBuf;

    fn b(s: &str) -> BoundVersion {
        BoundVersion::parse(s).unwrap()
    }

    fn scan_one(content: &str) -> Result<RequiresScan, RequiresError> {
        scan([(Path::new("a.ps1"), content)])
    }

    #[test]
    fn test_bare_and_quoted_names() {
        let result = scan_one("#Requires -Modules Pester, 'PSReadLine', \"Az\"\n").unwrap();
        let kinds: Vec<DeclKind> = result.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                DeclKind::name("Pester"),
                DeclKind::name("PSReadLine"),
                DeclKind::name("Az")
            ]
        );
        assert_eq!(result.declarations[0].line, 1);
        assert_eq!(result.declarations[0].source, Some(PathBuf::from("a.ps1")));
    }

    #[test]
    fn test_hashtable_form() {
        let result = scan_one(
            "#requires -modules @{ ModuleName = 'Az.Accounts'; \
             ModuleVersion = '2.0'; MaximumVersion = '3.0' }",
        )
        .unwrap();
        assert_eq!(
            result.declarations[0].kind,
            DeclKind::spec(
                "Az.Accounts",
                DependencyBounds {
                    exact: None,
                    minimum: Some(b("2.0")),
                    maximum: Some(b("3.0")),
                }
            )
        );
    }

    #[test]
    fn test_hashtable_required_version() {
        let result =
            scan_one("#Requires -Modules @{ModuleName=\"X\";RequiredVersion=\"1.0.0\"}").unwrap();
        let bounds = result.declarations[0].kind.bounds().unwrap();
        assert_eq!(bounds.exact, Some(b("1.0.0")));
    }

    #[test]
    fn test_version_and_edition() {
        let result = scan([
            (Path::new("a.ps1"), "#Requires -Version 5.1\n#Requires -PSEdition Desktop"),
            (Path::new("b.ps1"), "  #REQUIRES -Version 7.2 -PSEdition Core"),
        ])
        .unwrap();
        assert_eq!(result.minimum_host_version, Some(b("7.2")));
        assert_eq!(result.editions, vec![Edition::Core, Edition::Desktop]);
    }

    #[test]
    fn test_declarations_in_file_order() {
        let result = scan([
            (Path::new("a.ps1"), "#Requires -Modules B\nWrite-Host hi\n#Requires -Modules A"),
            (Path::new("b.ps1"), "#Requires -Modules C"),
        ])
        .unwrap();
        let names: Vec<&str> = result.kinds().map(|k| k.module_name()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(result.declarations[1].line, 3);
    }

    #[test]
    fn test_ignores_other_lines_and_parameters() {
        let result =
            scan_one("# requires nothing\n#Requires -RunAsAdministrator\nfunction X {}").unwrap();
        assert!(result.declarations.is_empty());
    }

    #[test]
    fn test_invalid_version_reports_location() {
        let err = scan_one("\n#Requires -Version seven").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.path, PathBuf::from("a.ps1"));
    }

    #[test]
    fn test_unknown_edition_is_error() {
        assert!(scan_one("#Requires -PSEdition Nano").is_err());
    }

    #[test]
    fn test_hashtable_without_name_is_error() {
        assert!(scan_one("#Requires -Modules @{ ModuleVersion = '1.0' }").is_err());
    }

    #[test]
    fn test_empty_modules_is_error() {
        assert!(scan_one("#Requires -Modules").is_err());
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("A, @{ ModuleName = 'B'; X = 'c,d' }, 'E,F'", ',');
        assert_eq!(parts, vec!["A", "@{ ModuleName = 'B'; X = 'c,d' }", "'E,F'"]);
    }
}
