use std::path::PathBuf;

use ftree::FileTreeConfig;

use crate::cli::Cli;
use crate::script::ScriptOptions;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub script: PathBuf,
    pub check_invariants: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            script: cli.script,
            check_invariants: cli.check_invariants,
        }
    }
}

impl RuntimeConfig {
    /// Merges the command line with a script's options. The command line can
    /// only turn checking on.
    pub fn tree_config(&self, options: &ScriptOptions) -> FileTreeConfig {
        let defaults = FileTreeConfig::default();
        let check_invariants = self.check_invariants
            || options
                .check_invariants
                .unwrap_or(defaults.check_invariants);

        defaults
            .with_check_invariants(check_invariants)
            .with_node_capacity(options.node_capacity)
    }
}
