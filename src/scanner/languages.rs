//! Language table used by the line counter.
//!
//! Each entry maps file extensions (and a few well-known file names) to a
//! language name plus the comment markers needed to classify its lines.

use std::path::Path;

/// Comment syntax and file patterns for one language.
#[derive(Debug)]
pub struct Language {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub filenames: &'static [&'static str],
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
}

const C_BLOCK: Option<(&str, &str)> = Some(("/*", "*/"));
const XML_BLOCK: Option<(&str, &str)> = Some(("<!--", "-->"));

macro_rules! lang {
    ($name:expr, [$($ext:expr),*], [$($file:expr),*], [$($lc:expr),*], $block:expr) => {
        Language {
            name: $name,
            extensions: &[$($ext),*],
            filenames: &[$($file),*],
            line_comments: &[$($lc),*],
            block_comment: $block,
        }
    };
}

pub static LANGUAGES: &[Language] = &[
    lang!("Rust", ["rs"], [], ["//"], C_BLOCK),
    lang!("Go", ["go"], [], ["//"], C_BLOCK),
    lang!("Python", ["py", "pyw", "pyi"], [], ["#"], Some(("\"\"\"", "\"\"\""))),
    lang!("JavaScript", ["js", "mjs", "cjs"], [], ["//"], C_BLOCK),
    lang!("JSX", ["jsx"], [], ["//"], C_BLOCK),
    lang!("TypeScript", ["ts", "mts", "cts", "tsx"], [], ["//"], C_BLOCK),
    lang!("Java", ["java"], [], ["//"], C_BLOCK),
    lang!("Kotlin", ["kt", "kts"], [], ["//"], C_BLOCK),
    lang!("Scala", ["scala", "sc"], [], ["//"], C_BLOCK),
    lang!("Groovy", ["groovy", "gradle"], [], ["//"], C_BLOCK),
    lang!("C", ["c"], [], ["//"], C_BLOCK),
    lang!("C Header", ["h"], [], ["//"], C_BLOCK),
    lang!("C++", ["cpp", "cc", "cxx", "hpp", "hh", "hxx"], [], ["//"], C_BLOCK),
    lang!("C#", ["cs"], [], ["//"], C_BLOCK),
    lang!("Objective-C", ["m", "mm"], [], ["//"], C_BLOCK),
    lang!("Swift", ["swift"], [], ["//"], C_BLOCK),
    lang!("Dart", ["dart"], [], ["//"], C_BLOCK),
    lang!("Zig", ["zig"], [], ["//"], None),
    lang!("Protocol Buffers", ["proto"], [], ["//"], C_BLOCK),
    lang!("PHP", ["php"], [], ["//", "#"], C_BLOCK),
    lang!("Ruby", ["rb", "rake"], ["Rakefile", "Gemfile"], ["#"], Some(("=begin", "=end"))),
    lang!("Perl", ["pl", "pm"], [], ["#"], Some(("=pod", "=cut"))),
    lang!("Bourne Shell", ["sh"], [], ["#"], None),
    lang!("Bourne Again Shell", ["bash"], [], ["#"], None),
    lang!("PowerShell", ["ps1", "psm1"], [], ["#"], Some(("<#", "#>"))),
    lang!("Lua", ["lua"], [], ["--"], Some(("--[[", "]]"))),
    lang!("R", ["r"], [], ["#"], None),
    lang!("Julia", ["jl"], [], ["#"], Some(("#=", "=#"))),
    lang!("Nim", ["nim"], [], ["#"], Some(("#[", "]#"))),
    lang!("Haskell", ["hs"], [], ["--"], Some(("{-", "-}"))),
    lang!("OCaml", ["ml", "mli"], [], [], Some(("(*", "*)"))),
    lang!("F#", ["fs", "fsx"], [], ["//"], Some(("(*", "*)"))),
    lang!("Elixir", ["ex", "exs"], [], ["#"], None),
    lang!("Erlang", ["erl", "hrl"], [], ["%"], None),
    lang!("Clojure", ["clj", "cljs", "cljc"], [], [";"], None),
    lang!("Vim Script", ["vim"], [], ["\""], None),
    lang!("SQL", ["sql"], [], ["--"], C_BLOCK),
    lang!("HTML", ["html", "htm"], [], [], XML_BLOCK),
    lang!("XML", ["xml", "xsd", "xsl"], [], [], XML_BLOCK),
    lang!("Vuejs Component", ["vue"], [], ["//"], XML_BLOCK),
    lang!("Svelte", ["svelte"], [], ["//"], XML_BLOCK),
    lang!("CSS", ["css"], [], [], C_BLOCK),
    lang!("SCSS", ["scss"], [], ["//"], C_BLOCK),
    lang!("Less", ["less"], [], ["//"], C_BLOCK),
    lang!("YAML", ["yaml", "yml"], [], ["#"], None),
    lang!("TOML", ["toml"], [], ["#"], None),
    lang!("JSON", ["json"], [], [], None),
    lang!("Markdown", ["md", "markdown"], [], [], None),
    lang!("HCL", ["tf", "hcl"], [], ["#", "//"], C_BLOCK),
    lang!("CMake", ["cmake"], ["CMakeLists.txt"], ["#"], None),
    lang!("Makefile", ["mk", "mak"], ["Makefile", "makefile", "GNUmakefile"], ["#"], None),
    lang!("Dockerfile", ["dockerfile"], ["Dockerfile"], ["#"], None),
];

/// Detect the language of a file from its name or extension.
pub fn detect(path: &Path) -> Option<&'static Language> {
    let file_name = path.file_name().and_then(|n| n.to_str())?;

    if let Some(lang) = LANGUAGES.iter().find(|l| l.filenames.contains(&file_name)) {
        return Some(lang);
    }

    let ext = path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|l| l.extensions.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect(Path::new("src/main.rs")).map(|l| l.name), Some("Rust"));
        assert_eq!(detect(Path::new("a/b/app.PY")).map(|l| l.name), Some("Python"));
        assert_eq!(detect(Path::new("x.hpp")).map(|l| l.name), Some("C++"));
    }

    #[test]
    fn test_detect_by_file_name() {
        assert_eq!(detect(Path::new("Makefile")).map(|l| l.name), Some("Makefile"));
        assert_eq!(
            detect(Path::new("docker/Dockerfile")).map(|l| l.name),
            Some("Dockerfile")
        );
        assert_eq!(
            detect(Path::new("CMakeLists.txt")).map(|l| l.name),
            Some("CMake")
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert!(detect(Path::new("LICENSE")).is_none());
        assert!(detect(Path::new("image.png")).is_none());
    }

    #[test]
    fn test_extensions_are_unique() {
        let mut seen = HashSet::new();
        for lang in LANGUAGES {
            for ext in lang.extensions {
                assert!(seen.insert(*ext), "duplicate extension: {}", ext);
            }
        }
    }
}
