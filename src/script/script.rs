use std::borrow::Cow;
use std::path::Path;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::script::Operation;

const OPTIONS_KEY: &str = "options";
const OPERATIONS_KEY: &str = "operations";

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

/// Tree settings requested by a script. Unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOptions {
    pub check_invariants: Option<bool>,
    pub node_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub options: ScriptOptions,
    pub operations: Vec<Operation>,
}

impl Script {
    pub async fn read(path: &Path) -> Result<Self, ScriptError> {
        debug!("Reading script file: {}", path.display());
        let file_path = path.display().to_string();
        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: file_path.clone(),
        })?;
        debug!("Successfully read script file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu { file_path })?;
        contents.as_str().try_into()
    }

    fn parse_options(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<ScriptOptions, ScriptError> {
        let Some(options) = top_level.get(&key(OPTIONS_KEY)) else {
            return Ok(ScriptOptions::default());
        };
        let options = options.as_mapping().context(OptionsNotMapSnafu)?;

        let check_invariants = match options.get(&key("checkInvariants")) {
            None => None,
            Some(Yaml::Value(Scalar::Boolean(check))) => Some(*check),
            Some(_) => {
                return InvalidOptionSnafu {
                    option: "checkInvariants",
                }
                .fail();
            }
        };

        let node_capacity = match options.get(&key("nodeCapacity")) {
            None => None,
            Some(Yaml::Value(Scalar::Integer(capacity))) => Some(
                usize::try_from(*capacity)
                    .ok()
                    .context(InvalidOptionSnafu {
                        option: "nodeCapacity",
                    })?,
            ),
            Some(_) => {
                return InvalidOptionSnafu {
                    option: "nodeCapacity",
                }
                .fail();
            }
        };

        Ok(ScriptOptions {
            check_invariants,
            node_capacity,
        })
    }

    fn parse_operations(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<Operation>, ScriptError> {
        let Some(operations) = top_level.get(&key(OPERATIONS_KEY)) else {
            return Ok(Vec::new());
        };

        let operations = operations
            .as_sequence()
            .context(OperationsNotSequenceSnafu)?
            .iter()
            .filter_map(Operation::from_yaml)
            .collect::<Vec<_>>();

        Ok(operations)
    }
}

impl TryFrom<&str> for Script {
    type Error = ScriptError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let contents = contents_vec.first().context(MalformedScriptSnafu)?;

        let top_level = contents.as_mapping().context(TopLevelNotMapSnafu)?;

        Ok(Script {
            options: Self::parse_options(top_level)?,
            operations: Self::parse_operations(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ScriptError {
    #[snafu(display("Failed to read the script file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The script file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the script file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted script file"))]
    MalformedScript,
    #[snafu(display("Top level of a script should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Options section should be a map"))]
    OptionsNotMap,
    #[snafu(display("Option '{}' has an invalid value", option))]
    InvalidOption { option: String },
    #[snafu(display("Operations section should be a list"))]
    OperationsNotSequence,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[compio::test]
    async fn script_returns_error_on_nonexistent_file() {
        let result = Script::read(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ScriptError::ReadError { .. })));
    }

    #[compio::test]
    async fn script_reads_from_disk() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "operations:\n  - insertDirectory: /a\n  - dump")
            .expect("Failed to write to temp file");

        let script = Script::read(file.path()).await.expect("script should load");

        assert_eq!(
            script.operations,
            vec![
                Operation::InsertDirectory { path: "/a".into() },
                Operation::Dump
            ]
        );
    }

    #[compio::test]
    async fn script_rejects_invalid_utf8() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(&[0xff, 0xfe, 0x00])
            .expect("Failed to write to temp file");

        let result = Script::read(file.path()).await;
        assert!(matches!(result, Err(ScriptError::EncodingError { .. })));
    }

    #[test]
    fn script_returns_error_on_invalid_yaml() {
        let result: Result<Script, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ScriptError::ParseError { .. })));
    }

    #[test]
    fn script_returns_error_on_empty_file() {
        let result: Result<Script, _> = "".try_into();
        assert!(matches!(result, Err(ScriptError::MalformedScript)));
    }

    #[test]
    fn script_returns_error_when_top_level_is_not_map() {
        let result: Result<Script, _> = "- item1\n- item2".try_into();
        assert!(matches!(result, Err(ScriptError::TopLevelNotMap)));
    }

    #[test]
    fn script_returns_error_when_operations_is_not_list() {
        let result: Result<Script, _> = "operations:\n  dump: yes".try_into();
        assert!(matches!(result, Err(ScriptError::OperationsNotSequence)));
    }

    #[test]
    fn script_handles_missing_sections() {
        let script: Script = "other: value".try_into().expect("script should parse");
        assert!(script.operations.is_empty());
        assert_eq!(script.options, ScriptOptions::default());
    }

    #[test]
    fn script_reads_options() {
        let source = "options:\n  checkInvariants: false\n  nodeCapacity: 12\n";
        let script: Script = source.try_into().expect("script should parse");
        assert_eq!(
            script.options,
            ScriptOptions {
                check_invariants: Some(false),
                node_capacity: Some(12),
            }
        );
    }

    #[test]
    fn script_rejects_invalid_options() {
        let negative: Result<Script, _> = "options:\n  nodeCapacity: -1".try_into();
        let textual: Result<Script, _> = "options:\n  checkInvariants: sometimes".try_into();
        let listed: Result<Script, _> = "options:\n  - nodeCapacity".try_into();

        assert!(matches!(negative, Err(ScriptError::InvalidOption { .. })));
        assert!(matches!(textual, Err(ScriptError::InvalidOption { .. })));
        assert!(matches!(listed, Err(ScriptError::OptionsNotMap)));
    }

    #[test]
    fn script_skips_invalid_operations() {
        let source = r#"
operations:
  - insertDirectory: /a
  - launch: /rocket
  - 17
  - insertFile:
      path: /a/readme
      contents: "hello"
"#;
        let script: Script = source.try_into().expect("script should parse");
        assert_eq!(
            script.operations,
            vec![
                Operation::InsertDirectory { path: "/a".into() },
                Operation::InsertFile {
                    path: "/a/readme".into(),
                    contents: "hello".into(),
                },
            ]
        );
    }
}
