//! Runtime helpers and layout of bundled output

use crate::names::quote_string;
use crate::sourcemap::Mapping;

/// Opening of every bundle: the module loader and export helpers.
///
/// Each module function receives its exports object. `__require` caches the
/// exports object before running the module, so a cyclic import sees the
/// getters installed so far instead of recursing.
const BUNDLE_HEADER: &str = r#"(function () {
  "use strict";
  const __cache = Object.create(null);
  function __require(id) {
    const cached = __cache[id];
    if (cached !== undefined) {
      return cached;
    }
    const exports = Object.create(null);
    __cache[id] = exports;
    __modules[id](exports);
    return exports;
  }
  function __export(target, name, get) {
    Object.defineProperty(target, name, { enumerable: true, get: get });
  }
  function __exportAll(target, source) {
    for (const name of Object.keys(source)) {
      if (name !== "default" && !Object.prototype.hasOwnProperty.call(target, name)) {
        __export(target, name, () => source[name]);
      }
    }
  }
  function __external(name) {
    const value = typeof require === "function" ? require(name) : globalThis[name];
    if (value !== null && typeof value === "object" && "default" in value) {
      return value;
    }
    return Object.assign(Object.create(null), value, { default: value });
  }
  const __modules = {
"#;

const MODULE_INDENT: &str = "    ";

/// A finished bundle. Mapping source indices point into `sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub code: String,
    pub mappings: Option<Vec<Mapping>>,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
}

/// Assembles module bodies into one self-invoking function. Modules are
/// laid out in the order they are added; only entries are run by the
/// bootstrap, everything else is reached through `__require`.
#[derive(Debug)]
pub struct BundleBuilder {
    code: String,
    line: u32,
    mappings: Option<Vec<Mapping>>,
    sources: Vec<String>,
    sources_content: Vec<String>,
    entries: Vec<String>,
}

impl BundleBuilder {
    pub fn new(track_positions: bool) -> Self {
        Self {
            code: BUNDLE_HEADER.to_string(),
            line: BUNDLE_HEADER.matches('\n').count() as u32,
            mappings: track_positions.then(Vec::new),
            sources: Vec::new(),
            sources_content: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Adds a module generated in bundled format. `source` names the file
    /// its mappings point into.
    pub fn add_module(
        &mut self,
        id: &str,
        source: &str,
        source_content: &str,
        code: &str,
        mappings: Option<&[Mapping]>,
    ) {
        let source_index = self.sources.len() as u32;
        self.sources.push(source.to_string());
        self.sources_content.push(source_content.to_string());

        self.code.push_str(&format!("  {}: function (__exports) {{\n", quote_string(id)));
        self.line += 1;
        let first_line = self.line;
        for line in code.lines() {
            if !line.is_empty() {
                self.code.push_str(MODULE_INDENT);
                self.code.push_str(line);
            }
            self.code.push('\n');
            self.line += 1;
        }
        if let (Some(all), Some(module)) = (&mut self.mappings, mappings) {
            all.extend(
                module
                    .iter()
                    .map(|m| m.shifted(first_line, MODULE_INDENT.len() as u32).with_source(source_index)),
            );
        }
        self.code.push_str("  },\n");
        self.line += 1;
    }

    /// Marks an added module as one the bundle runs on load.
    pub fn add_entry(&mut self, id: &str) {
        if !self.entries.iter().any(|entry| entry == id) {
            self.entries.push(id.to_string());
        }
    }

    /// Closes the module table and runs the entries in the order they were
    /// marked. Dependencies run from inside the modules that import them.
    pub fn finish(mut self) -> Bundle {
        self.code.push_str("  };\n");
        for id in &self.entries {
            self.code.push_str(&format!("  __require({});\n", quote_string(id)));
        }
        self.code.push_str("})();\n");
        Bundle {
            code: self.code,
            mappings: self.mappings,
            sources: self.sources,
            sources_content: self.sources_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_entries_are_bootstrapped() {
        let mut builder = BundleBuilder::new(false);
        builder.add_module("a.vz", "a.vz", "", "const a = 1;\n", None);
        builder.add_module("main.vz", "main.vz", "", "const b = 2;\n", None);
        builder.add_entry("main.vz");
        builder.add_entry("main.vz");
        let bundle = builder.finish();
        let a = bundle.code.find("const a = 1;").unwrap();
        let b = bundle.code.find("const b = 2;").unwrap();
        assert!(a < b);
        assert!(!bundle.code.contains("  __require(\"a.vz\");"));
        assert_eq!(bundle.code.matches("  __require(\"main.vz\");").count(), 1);
        assert!(bundle.code.ends_with("  };\n  __require(\"main.vz\");\n})();\n"));
        assert!(bundle.code.starts_with("(function () {"));
        assert!(bundle.code.ends_with("})();\n"));
    }

    #[test]
    fn test_mappings_shift_into_module_slot() {
        let mut builder = BundleBuilder::new(true);
        let mapping = Mapping {
            generated_line: 0,
            generated_column: 0,
            source: 0,
            source_line: 0,
            source_column: 0,
        };
        builder.add_module("a.vz", "a.vz", "", "x;\n", Some(&[mapping]));
        builder.add_module("b.vz", "b.vz", "", "y;\n", Some(&[mapping]));
        let bundle = builder.finish();
        let mappings = bundle.mappings.unwrap();
        let lines: Vec<&str> = bundle.code.lines().collect();
        let first = mappings[0];
        assert_eq!(&lines[first.generated_line as usize][first.generated_column as usize..], "x;");
        let second = mappings[1];
        assert_eq!(second.source, 1);
        assert_eq!(&lines[second.generated_line as usize][second.generated_column as usize..], "y;");
    }
}
