//! Compilation database loading.
//!
//! Inputs are either a `compile_commands.json` in the standard array form
//! (as produced by common build systems) or bare source files, which get a
//! trivial implicit compile command. Glob patterns expand relative to the
//! source root.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// One entry of the compilation database.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileCommand {
    /// The working directory of the compilation.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// The main translation-unit file.
    pub file: String,
    /// The command as a single shell string.
    #[serde(default)]
    pub command: Option<String>,
    /// The command as an argument vector.
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
}

fn default_directory() -> String {
    ".".to_owned()
}

impl CompileCommand {
    /// A trivial command for a bare source file.
    pub fn trivial(file: impl Into<String>) -> Self {
        Self {
            directory: default_directory(),
            file: file.into(),
            command: None,
            arguments: None,
        }
    }

    /// The translation-unit path resolved against the working directory.
    pub fn absolute_file(&self) -> PathBuf {
        let file = Path::new(&self.file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            Path::new(&self.directory).join(file)
        }
    }

    /// `-D` macro definitions from the command line, in order.
    pub fn defines(&self) -> Vec<String> {
        let args: Vec<String> = match (&self.arguments, &self.command) {
            (Some(arguments), _) => arguments.clone(),
            (None, Some(command)) => command.split_whitespace().map(str::to_owned).collect(),
            (None, None) => Vec::new(),
        };
        let mut defines = Vec::new();
        let mut iter = args.iter().peekable();
        while let Some(arg) = iter.next() {
            if let Some(rest) = arg.strip_prefix("-D") {
                if rest.is_empty() {
                    if let Some(next) = iter.next() {
                        defines.push(next.clone());
                    }
                } else {
                    defines.push(rest.to_owned());
                }
            }
        }
        defines
    }
}

/// The set of translation units to extract from.
#[derive(Debug, Default)]
pub struct CompilationDatabase {
    /// Commands sorted by file for deterministic processing.
    pub commands: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load the standard JSON form.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::new(format!("read \"{}\": {err}", path.display())))?;
        let mut commands: Vec<CompileCommand> = serde_json::from_str(&text)
            .map_err(|err| Error::new(format!("parse \"{}\": {err}", path.display())))?;
        commands.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(Self { commands })
    }

    /// Build from bare source files with trivial commands.
    pub fn from_sources<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut commands: Vec<CompileCommand> =
            files.into_iter().map(|f| CompileCommand::trivial(f)).collect();
        commands.sort_by(|a, b| a.file.cmp(&b.file));
        Self { commands }
    }

    /// Resolve a mixed input list: a compilation database path, source
    /// files, or glob patterns, relative to `source_root`.
    pub fn from_inputs(inputs: &[String], source_root: Option<&Path>) -> Result<Self, Error> {
        let mut files: Vec<String> = Vec::new();
        for input in inputs {
            let resolved: PathBuf = match source_root {
                Some(root) if !Path::new(input).is_absolute() => root.join(input),
                _ => PathBuf::from(input),
            };
            if resolved
                .file_name()
                .is_some_and(|name| name == "compile_commands.json")
            {
                let mut db = Self::load(&resolved)?;
                files.extend(db.commands.drain(..).map(|c| c.file));
                continue;
            }
            let pattern = resolved.to_string_lossy().into_owned();
            if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
                let matches = glob::glob(&pattern)
                    .map_err(|err| Error::new(format!("invalid glob \"{pattern}\": {err}")))?;
                let mut any = false;
                for entry in matches {
                    let path = entry
                        .map_err(|err| Error::new(format!("glob \"{pattern}\": {err}")))?;
                    files.push(path.to_string_lossy().into_owned());
                    any = true;
                }
                if !any {
                    return Err(Error::new(format!("\"{pattern}\" matched no files")));
                }
            } else {
                if !resolved.exists() {
                    return Err(Error::new(format!(
                        "input \"{}\" does not exist",
                        resolved.display()
                    )));
                }
                files.push(pattern);
            }
        }
        Ok(Self::from_sources(files))
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_standard_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_commands.json");
        std::fs::write(
            &path,
            r#"[
                {"directory": "/build", "file": "b.cpp", "command": "c++ -DB=2 -c b.cpp"},
                {"directory": "/build", "file": "a.cpp", "arguments": ["c++", "-DA", "-c", "a.cpp"]}
            ]"#,
        )
        .unwrap();
        let db = CompilationDatabase::load(&path).unwrap();
        assert_eq!(db.len(), 2);
        // Sorted by file.
        assert_eq!(db.commands[0].file, "a.cpp");
        assert_eq!(db.commands[0].defines(), vec!["A"]);
        assert_eq!(db.commands[1].defines(), vec!["B=2"]);
    }

    #[test]
    fn absolute_file_resolution() {
        let command = CompileCommand {
            directory: "/build".to_owned(),
            file: "src/a.cpp".to_owned(),
            command: None,
            arguments: None,
        };
        assert_eq!(command.absolute_file(), PathBuf::from("/build/src/a.cpp"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let err =
            CompilationDatabase::from_inputs(&["definitely/not/here.hpp".to_owned()], None)
                .unwrap_err();
        assert!(err.message().contains("does not exist"));
    }

    #[test]
    fn glob_inputs_expand() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.hpp"), "int a;").unwrap();
        std::fs::write(dir.path().join("two.hpp"), "int b;").unwrap();
        let pattern = format!("{}/*.hpp", dir.path().display());
        let db = CompilationDatabase::from_inputs(&[pattern], None).unwrap();
        assert_eq!(db.len(), 2);
    }
}
