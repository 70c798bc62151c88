//! Human-readable report of a scan.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Condition, Paint};

use crate::duplicates::ScanSummary;
use crate::plan::DeletionPlan;

/// Plain text formatter, optionally coloured.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    plan: &'a DeletionPlan,
    summary: &'a ScanSummary,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a text formatter with colours enabled.
    #[must_use]
    pub fn new(plan: &'a DeletionPlan, summary: &'a ScanSummary) -> Self {
        Self {
            plan,
            summary,
            color: true,
        }
    }

    /// Enable or disable ANSI colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn condition(&self) -> Condition {
        if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let when = self.condition();

        if self.plan.is_empty() {
            writeln!(writer, "{}", "No dupes found.".green().whenever(when))?;
        }

        for set in &self.plan.sets {
            writeln!(
                writer,
                "{} {} each, same {}:",
                "Dupes found,".bold().whenever(when),
                ByteSize::b(set.size()),
                set.domain()
            )?;
            writeln!(
                writer,
                "  {}   {}",
                "keep".green().whenever(when),
                set.keep().absolute_path.display()
            )?;
            for file in set.removals() {
                writeln!(
                    writer,
                    "  {} {}",
                    "remove".red().whenever(when),
                    file.absolute_path.display()
                )?;
            }
            writeln!(writer)?;
        }

        if !self.plan.is_empty() {
            writeln!(
                writer,
                ">>>>> Extensions found in dupes: {}",
                self.plan.extensions_line()
            )?;
        }

        let sets = self.plan.len();
        let removals = self.plan.removal_count();
        writeln!(
            writer,
            "{}",
            format!(
                "Scanned {} files ({}): {} duplicate set{}, {} removable file{}, {} reclaimable",
                self.summary.total_files,
                ByteSize::b(self.summary.total_size),
                sets,
                if sets == 1 { "" } else { "s" },
                removals,
                if removals == 1 { "" } else { "s" },
                ByteSize::b(self.plan.reclaimable_space()),
            )
            .dim()
            .whenever(when)
        )?;

        if self.summary.unreadable_files > 0 || self.summary.scan_errors > 0 {
            writeln!(
                writer,
                "{}",
                format!(
                    "Skipped {} unreadable file(s) and {} walk error(s); see warnings above",
                    self.summary.unreadable_files, self.summary.scan_errors
                )
                .yellow()
                .whenever(when)
            )?;
        }

        Ok(())
    }
}
