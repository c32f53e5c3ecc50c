use ftree::{FileTree, FileTreeError};
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::application::report::Report;
use crate::script::{Script, ScriptError};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let script = Script::read(&app_config.script)
            .await
            .context(ScriptSnafu)?;
        debug!("Loaded script: {:?}", script);

        let tree_config = app_config.tree_config(&script.options);
        info!("Tree configuration: {:?}", tree_config);

        let mut tree = FileTree::with_config(tree_config);
        tree.init().context(TreeSetupSnafu)?;

        let report = Report::for_stdout();
        let mut failures = 0;
        for (index, operation) in script.operations.iter().enumerate() {
            let outcome = operation.run(&mut tree);
            if outcome.is_failure() {
                failures += 1;
                warn!("Operation '{}' failed: {}", operation, outcome);
            }
            println!("{}", report.outcome_line(index + 1, operation, &outcome));
        }

        println!("{}", report.dump_block(tree.dump().as_deref()));
        println!(
            "{}",
            report.summary_line(script.operations.len(), failures)
        );
        info!("Final tree holds {} nodes", tree.count());

        tree.destroy().context(TreeTeardownSnafu)?;
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the script"))]
    ScriptError { source: ScriptError },
    #[snafu(display("Critical failure encountered while setting up the tree"))]
    TreeSetupError { source: FileTreeError },
    #[snafu(display("Critical failure encountered while tearing down the tree"))]
    TreeTeardownError { source: FileTreeError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn runtime_config(script: PathBuf) -> RuntimeConfig {
        RuntimeConfig {
            script,
            check_invariants: true,
        }
    }

    #[compio::test]
    async fn application_runs_a_script() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            r#"
options:
  nodeCapacity: 16
operations:
  - insertDirectory: /a/b
  - insertFile:
      path: /a/b/f
      contents: "x"
  - removeFile: /a/missing
  - dump
"#
        )
        .expect("Failed to write to temp file");

        let result = Application::run(runtime_config(file.path().to_path_buf())).await;
        assert!(result.is_ok());
    }

    #[compio::test]
    async fn application_fails_on_missing_script() {
        let result = Application::run(runtime_config(PathBuf::from("missing.yaml"))).await;
        assert!(matches!(result, Err(ApplicationError::ScriptError { .. })));
    }

    #[compio::test]
    async fn application_fails_on_malformed_script() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "- just\n- a list").expect("Failed to write to temp file");

        let result = Application::run(runtime_config(file.path().to_path_buf())).await;
        assert!(matches!(
            result,
            Err(ApplicationError::ScriptError {
                source: ScriptError::TopLevelNotMap
            })
        ));
    }
}
