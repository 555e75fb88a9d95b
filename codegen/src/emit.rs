//! Output stream management for task emission.
//!
//! Each task emits into two text streams, a header and a program file, that
//! open together and share their banner sections. A shared include list at a
//! well-known path is copied verbatim into both. What gets written comes from
//! the plan structures; this writer only owns the how.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use snafu::ResultExt;

use crate::error::{OutputFileSnafu, Result, StreamWriteSnafu};

/// The header/program writer pair of one task.
#[derive(Debug)]
pub struct TaskEmitter<H: Write, P: Write> {
    header: H,
    program: P,
}

impl TaskEmitter<BufWriter<File>, BufWriter<File>> {
    /// Open both output files; failure of either is fatal.
    pub fn create(header_path: &Path, program_path: &Path) -> Result<Self> {
        let header = File::create(header_path)
            .context(OutputFileSnafu { path: header_path.display().to_string() })?;
        let program = File::create(program_path)
            .context(OutputFileSnafu { path: program_path.display().to_string() })?;
        Ok(Self::new(BufWriter::new(header), BufWriter::new(program)))
    }
}

impl<H: Write, P: Write> TaskEmitter<H, P> {
    pub fn new(header: H, program: P) -> Self {
        Self { header, program }
    }

    pub fn header(&mut self) -> &mut H {
        &mut self.header
    }

    pub fn program(&mut self) -> &mut P {
        &mut self.program
    }

    /// Write a banner section title into both streams.
    pub fn write_section_banner(&mut self, title: &str) -> Result<()> {
        let banner = format!(
            "/*{line}\n{title}\n{line}*/\n",
            line = "-".repeat(84),
        );
        self.header.write_all(banner.as_bytes()).context(StreamWriteSnafu { stream: "header" })?;
        self.program.write_all(banner.as_bytes()).context(StreamWriteSnafu { stream: "program" })
    }

    /// Copy a shared include list verbatim into both streams.
    pub fn copy_shared_includes<R: BufRead>(&mut self, includes: R) -> Result<()> {
        for line in includes.lines() {
            let line = line.context(OutputFileSnafu { path: "<shared include list>" })?;
            writeln!(self.header, "{line}").context(StreamWriteSnafu { stream: "header" })?;
            writeln!(self.program, "{line}").context(StreamWriteSnafu { stream: "program" })?;
        }
        Ok(())
    }

    /// Open the shared include list and copy it in; inability to open it is
    /// fatal with the offending path in the message.
    pub fn copy_shared_includes_from(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).context(OutputFileSnafu { path: path.display().to_string() })?;
        self.copy_shared_includes(std::io::BufReader::new(file))
    }

    /// Flush both streams at the end of emission.
    pub fn finish(mut self) -> Result<()> {
        self.header.flush().context(StreamWriteSnafu { stream: "header" })?;
        self.program.flush().context(StreamWriteSnafu { stream: "program" })
    }
}
