use clap::{Args, Subcommand};
use std::io::{self, Write};

#[derive(Args)]
pub struct SchedulerCommand {
    #[command(subcommand)]
    pub command: SchedulerSubcommand,
}

#[derive(Subcommand)]
pub enum SchedulerSubcommand {
    /// Manage scheduler jobs
    Job(JobCommand),
}

#[derive(Args)]
pub struct JobCommand {
    #[command(subcommand)]
    pub command: JobSubcommand,
}

#[derive(Subcommand)]
pub enum JobSubcommand {
    /// Enables a scheduler job
    Enable,

    /// Displays the status of a scheduler job
    Status,
}

impl SchedulerCommand {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.write_to(&mut io::stdout().lock())?;
        Ok(())
    }

    // Both job commands are placeholders: no state is read or changed.
    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        match &self.command {
            SchedulerSubcommand::Job(job) => match job.command {
                JobSubcommand::Enable | JobSubcommand::Status => {
                    writeln!(out)?;
                    writeln!(out, "Done")
                }
            },
        }
    }
}
