//! Render fragment records.

use std::io::{self, Write};

use clap::ValueEnum;
use itertools::Itertools;

use crate::{enumerate::FragmentRecord, loader::write_gspan};

/// Format of emitted fragments.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum OutputFormat {
    /// One YAML list entry per fragment:
    /// `- [ "pattern", statistic, [ids of highest class], ..., [ids of lowest class] ]`.
    #[default]
    Yaml,
    /// Tab-separated pattern, statistic, p-value, direction, support and ids.
    Tsv,
    /// The fragment graph as a gSpan block.
    Gspan,
}

impl OutputFormat {
    /// Line written between backbone refinement classes.
    pub fn separator(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "---",
            OutputFormat::Tsv | OutputFormat::Gspan => "#",
        }
    }
}

fn id_list(ids: &[u64]) -> String {
    format!("[{}]", ids.iter().join(", "))
}

/// Render one record, without a trailing newline.
pub fn format_record(record: &FragmentRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Yaml => format!(
            "- [ {:?}, {}, {} ]",
            record.pattern,
            record.statistic,
            record.groups.iter().map(|g| id_list(g)).join(", ")
        ),
        OutputFormat::Tsv => format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.pattern,
            record.statistic,
            record.p_value,
            record.direction,
            record.weighted_support,
            record.matching_ids.iter().join(",")
        ),
        OutputFormat::Gspan => write_gspan(record.root as u64, &record.graph())
            .trim_end()
            .to_string(),
    }
}

/// Writes records, optionally numbered and split by backbone class.
pub struct RecordWriter<W: Write> {
    out: W,
    format: OutputFormat,
    line_numbers: bool,
    bbrc_sep: bool,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            line_numbers: false,
            bbrc_sep: false,
            written: 0,
        }
    }

    /// Prefix every record with its running number.
    pub fn line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    /// Write a separator whenever the backbone class changes.
    pub fn bbrc_sep(mut self, enabled: bool) -> Self {
        self.bbrc_sep = enabled;
        self
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write the records of one root.
    pub fn write_root(&mut self, records: &[FragmentRecord]) -> io::Result<()> {
        for (_, class) in &records.iter().chunk_by(|r| r.backbone) {
            if self.bbrc_sep {
                writeln!(self.out, "{}", self.format.separator())?;
            }
            for record in class {
                self.written += 1;
                let text = match self.format {
                    OutputFormat::Gspan => {
                        write_gspan(self.written as u64, &record.graph()).trim_end().to_string()
                    }
                    _ => format_record(record, self.format),
                };
                if self.line_numbers {
                    writeln!(self.out, "{}\t{}", self.written, text)?;
                } else {
                    writeln!(self.out, "{text}")?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
