//! Target specific commands.
//!
//! Drivers register tables of named commands on the targets they create. The
//! debugger forwards user command lines to [`Target::command`], which picks
//! the first command whose name starts with the first word of the line.

use std::fmt;

use crate::Target;

/// Runs a target command. `argv[0]` is the word the command was selected by.
///
/// Returns `false` if the command failed.
pub type CommandHandler = fn(&mut Target, &mut dyn fmt::Write, &[&str]) -> bool;

/// A named command with its help text.
#[derive(Clone, Copy, Debug)]
pub struct Command {
    /// Name the command is selected by, or by any prefix of it.
    pub name: &'static str,
    /// Runs the command.
    pub handler: CommandHandler,
    /// One line description shown by [`Target::command_help`].
    pub help: &'static str,
}

/// Commands registered by one driver, listed under the driver's name in the help.
#[derive(Debug)]
pub struct CommandTable {
    /// Name of the driver that registered the commands.
    pub owner: String,
    /// The commands, in the order they are searched.
    pub commands: &'static [Command],
}

/// Errors when running a target command.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum CommandError {
    /// No target command matches '{0}'.
    NotFound(String),
    /// The command '{0}' failed.
    Failed(&'static str),
}

impl Target {
    /// Registers a table of commands under `owner`.
    ///
    /// Tables are searched in registration order, so commands registered
    /// earlier win over later ones sharing a prefix.
    pub fn add_commands(&mut self, commands: &'static [Command], owner: impl Into<String>) {
        let owner = owner.into();
        tracing::debug!("Registering {} commands of {}", commands.len(), owner);
        self.commands.push(CommandTable { owner, commands });
    }

    /// Returns the registered command tables, in registration order.
    pub fn command_tables(&self) -> &[CommandTable] {
        &self.commands
    }

    fn find_command(&self, word: &str) -> Option<Command> {
        self.commands
            .iter()
            .flat_map(|table| table.commands)
            .find(|command| command.name.starts_with(word))
            .copied()
    }

    /// Runs the command selected by `argv[0]`, writing its output to `out`.
    pub fn command(&mut self, out: &mut dyn fmt::Write, argv: &[&str]) -> Result<(), CommandError> {
        let Some(word) = argv.first() else {
            return Err(CommandError::NotFound(String::new()));
        };

        let command = self
            .find_command(word)
            .ok_or_else(|| CommandError::NotFound(word.to_string()))?;

        tracing::debug!("Running target command '{}'", command.name);
        if (command.handler)(self, out, argv) {
            Ok(())
        } else {
            Err(CommandError::Failed(command.name))
        }
    }

    /// Writes the help of every registered command to `out`.
    pub fn command_help(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for table in &self.commands {
            writeln!(out, "{} specific commands:", table.owner)?;
            for command in table.commands {
                writeln!(out, "\t{} -- {}", command.name, command.help)?;
            }
        }
        Ok(())
    }
}
