//! Converter selection, invocation and temp-file lifecycle.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use dossier_shared::{ConverterCommand, ConverterConfig};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::ConversionError;

/// Extensions handled by the image converter.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_EOF_MARKER: &[u8] = b"%%EOF";
const PDF_TRAILER_WINDOW: usize = 1024;
const MAX_EXTENSION_LEN: usize = 16;

/// Which converter a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    /// Raster image to PDF.
    Image,
    /// Office document to PDF.
    Office,
}

impl ConverterKind {
    /// Pick the converter for a normalized extension.
    #[must_use]
    pub fn for_extension(extension: &str) -> Self {
        if IMAGE_EXTENSIONS.contains(&extension) {
            Self::Image
        } else {
            Self::Office
        }
    }
}

/// Lowercase extension of a client-supplied file name.
///
/// Only ASCII alphanumeric extensions survive; anything else yields an empty
/// string so the name cannot influence paths or arguments.
#[must_use]
pub fn normalized_extension(original_name: &str) -> String {
    let Some(ext) = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    else {
        return String::new();
    };

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    ext.to_ascii_lowercase()
}

/// Whether `bytes` look like a complete PDF document.
#[must_use]
pub fn is_well_formed_pdf(bytes: &[u8]) -> bool {
    if !bytes.starts_with(PDF_MAGIC) {
        return false;
    }
    let tail = &bytes[bytes.len().saturating_sub(PDF_TRAILER_WINDOW)..];
    tail.windows(PDF_EOF_MARKER.len())
        .any(|window| window == PDF_EOF_MARKER)
}

/// Temp files owned by one converter invocation.
#[derive(Debug)]
struct ConversionJob {
    input: PathBuf,
    output: PathBuf,
    kind: ConverterKind,
}

impl ConversionJob {
    fn remove_files(self) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed conversion temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove conversion temp file"),
            }
        }
    }
}

/// Converts uploads to PDF by running external converters.
#[derive(Debug, Clone)]
pub struct FormatNormalizer {
    config: ConverterConfig,
    timeout: Duration,
}

impl FormatNormalizer {
    /// Create a normalizer from converter settings.
    #[must_use]
    pub fn new(config: ConverterConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self { config, timeout }
    }

    /// Override the subprocess deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert `bytes` to PDF.
    ///
    /// The converter is run exactly once. Temp input and output files are
    /// removed before this returns, on success and on every error path.
    ///
    /// # Errors
    ///
    /// Returns an error if the converter cannot be started, fails, times out,
    /// or produces something that is not a complete PDF.
    pub async fn normalize(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<Vec<u8>, ConversionError> {
        let extension = normalized_extension(original_name);
        let kind = ConverterKind::for_extension(&extension);

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let stem = format!(
            "{}_{:016x}",
            Utc::now().timestamp_millis(),
            rand::random::<u64>()
        );
        let input_name = if extension.is_empty() {
            stem.clone()
        } else {
            format!("{stem}.{extension}")
        };

        // Both converters write `{outdir}/{stem}.pdf`.
        let job = scopeguard::guard(
            ConversionJob {
                input: self.config.work_dir.join(input_name),
                output: self.config.output_dir.join(format!("{stem}.pdf")),
                kind,
            },
            ConversionJob::remove_files,
        );

        tokio::fs::write(&job.input, bytes).await?;

        let command = self.command_for(job.kind);
        let args = substitute_args(command, &job.input, &job.output, &self.config.output_dir);
        self.run(&command.program, &args).await?;

        let pdf = match tokio::fs::read(&job.output).await {
            Ok(pdf) => pdf,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConversionError::MissingOutput(
                    job.output.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !is_well_formed_pdf(&pdf) {
            return Err(ConversionError::invalid_output(format!(
                "{} bytes without PDF header or trailer",
                pdf.len()
            )));
        }

        info!(
            converter = ?job.kind,
            input_size = bytes.len(),
            output_size = pdf.len(),
            "Document converted to PDF"
        );

        Ok(pdf)
    }

    fn command_for(&self, kind: ConverterKind) -> &ConverterCommand {
        match kind {
            ConverterKind::Image => &self.config.image,
            ConverterKind::Office => &self.config.office,
        }
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<(), ConversionError> {
        debug!(program, ?args, "Running converter");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The converter leads its own group so helpers it forks can be reached.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| ConversionError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        // No process of the group outlives this call, whatever the exit path.
        #[cfg(unix)]
        let _group = scopeguard::guard(child.id(), kill_process_group);

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(program, timeout = ?self.timeout, "Converter timed out, killed");
                return Err(ConversionError::TimedOut(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                program,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "Converter failed"
            );
            return Err(ConversionError::failed(output.status.code(), stderr));
        }

        Ok(())
    }
}

#[cfg(unix)]
fn kill_process_group(leader: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pgid) = leader.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    // ESRCH when every member has already exited.
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            warn!(pgid, error = %e, "Failed to kill converter process group");
        }
    }
}

fn substitute_args(
    command: &ConverterCommand,
    input: &Path,
    output: &Path,
    outdir: &Path,
) -> Vec<String> {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();
    let outdir = outdir.to_string_lossy();

    command
        .args
        .iter()
        .map(|arg| {
            arg.replace("{input}", &input)
                .replace("{output}", &output)
                .replace("{outdir}", &outdir)
        })
        .collect()
}
