//! Scheduler output interpretation.

use tracing::debug;

use crate::command::ComposedCommand;
use crate::domain::{ExecError, ExecutionMode, JobOptions, Result};

/// What a successful submission told us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    /// Known for batch submissions only.
    pub job_id: Option<String>,
    pub outputs: Vec<String>,
}

/// Extract the job ID from an `sbatch` acknowledgment.
///
/// The ID is the last token of the last non-empty line and must contain a
/// digit. `--parsable` output (`ID;cluster`) keeps only the ID.
pub fn parse_job_id(output: &str) -> Result<String> {
    let fail = || ExecError::JobIdParse {
        output: output.to_string(),
    };

    let line = output
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .ok_or_else(fail)?;

    let token = line.split_whitespace().last().ok_or_else(fail)?;
    let id = token.split(';').next().unwrap_or(token);
    if id.is_empty() || !id.chars().any(|c| c.is_ascii_digit()) {
        return Err(fail());
    }
    Ok(id.to_string())
}

/// Output and error files declared in the extra scheduler flags.
pub fn batch_outputs_from_options(options: &JobOptions) -> Vec<String> {
    let mut outputs = Vec::new();
    let mut args = options
        .extra
        .iter()
        .flat_map(|opt| opt.split_whitespace());

    while let Some(arg) = args.next() {
        let value = match arg {
            "-o" | "-e" | "--output" | "--error" => args.next().map(str::to_string),
            _ => ["--output=", "--error=", "-o", "-e"]
                .iter()
                .find_map(|flag| arg.strip_prefix(flag))
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        };
        if let Some(v) = value {
            outputs.push(v);
        }
    }
    outputs
}

/// Interpret raw transport output for the mode the command was composed in.
pub fn interpret(
    composed: &ComposedCommand,
    raw_output: &str,
    options: &JobOptions,
) -> Result<Interpretation> {
    match composed.mode {
        ExecutionMode::Batch => {
            let job_id = parse_job_id(raw_output.trim_matches('\n'))?;
            let mut outputs = batch_outputs_from_options(options);
            if outputs.is_empty() {
                outputs.push(format!("slurm-{job_id}.out"));
            }
            debug!(job_id = %job_id, ?outputs, "Parsed batch submission");
            Ok(Interpretation {
                job_id: Some(job_id),
                outputs,
            })
        }
        ExecutionMode::Interactive => Ok(Interpretation {
            job_id: None,
            outputs: composed.redirect_file.iter().cloned().collect(),
        }),
    }
}
