use std::path::Path;

use anyhow::Result;
use flaute_batch::{run_derive, DeriveConfig, MemberInputs, RunSummary};
use flaute_cli::cli::RunArgs;
use flaute_cli::config::FlauteConfig;

use crate::commands::util::{collaborators, print_summary, run_overrides};

pub fn handle(config: &FlauteConfig, member: &Path, run: &RunArgs) -> Result<RunSummary> {
    let (processes, overwrite) = run_overrides(run);
    let member = MemberInputs::load(member)?;
    let derive = DeriveConfig {
        output_dir: config.paths.output_dir.clone(),
        scratch_dir: config.paths.scratch_dir.clone(),
        overwrite: overwrite || config.run.overwrite,
        low_output: config.thresholds.low_output,
        workers: config.processes(processes),
    };
    let report = run_derive(&member, &derive, &collaborators(config)?)?;
    print_summary(&format!("derive {}", member.identity()), &report.summary);
    if report.written {
        for path in report.outputs.paths() {
            println!("  wrote {}", path.display());
        }
    }
    Ok(report.summary)
}
