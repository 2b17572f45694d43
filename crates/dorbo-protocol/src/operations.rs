//! Credential management operations built on [`Controller::run`].

use crate::commands::Command;
use crate::controller::Controller;
use crate::error::{ControllerError, ControllerResult};
use crate::responses::{decode_credential_list, decode_single_credential, Credential, StorageInfo};
use crate::transport::Transport;

impl<T: Transport> Controller<T> {
    /// List every stored Wiegand-26 credential.
    ///
    /// The list position of each credential is its storage index.
    pub fn list_wiegand26(&mut self) -> ControllerResult<Vec<Credential>> {
        let lines = self.run_checked(&Command::ListWiegand26)?;
        decode_credential_list(&lines)
    }

    /// Read the Wiegand-26 credential stored at `index`.
    pub fn get_wiegand26(&mut self, index: u8) -> ControllerResult<Credential> {
        let lines = self.run_checked(&Command::ReadWiegand26 { index })?;
        decode_single_credential(&lines)
    }

    /// Store `credential` at `index`.
    pub fn set_wiegand26(&mut self, index: u8, credential: Credential) -> ControllerResult<()> {
        let command = Command::WriteWiegand26 { index, credential };
        let lines = self.run_checked(&command)?;
        expect_no_data(&command, &lines)
    }

    /// Set every stored Wiegand-26 credential to facility 0, user 0.
    pub fn clear_wiegand26(&mut self) -> ControllerResult<()> {
        let command = Command::ClearWiegand26;
        let lines = self.run_checked(&command)?;
        expect_no_data(&command, &lines)
    }

    /// Query the storage capacity.
    pub fn storage_info(&mut self) -> ControllerResult<StorageInfo> {
        let lines = self.run_checked(&Command::Info)?;
        StorageInfo::parse(&lines)
    }

    /// Pulse the strike of `door`.
    pub fn open_door(&mut self, door: u8) -> ControllerResult<()> {
        let command = Command::OpenDoor { door };
        let lines = self.run_checked(&command)?;
        expect_no_data(&command, &lines)
    }

    /// Run a command and turn an `err` terminator into [`ControllerError::CommandFailure`].
    fn run_checked(&mut self, command: &Command) -> ControllerResult<Vec<String>> {
        let result = self.run(command)?;
        if !result.success {
            return Err(ControllerError::CommandFailure {
                command: command.to_command_string(),
                lines: result.lines,
            });
        }
        Ok(result.lines)
    }
}

fn expect_no_data(command: &Command, lines: &[String]) -> ControllerResult<()> {
    if lines.is_empty() {
        return Ok(());
    }
    Err(ControllerError::violation(format!(
        "expected no response lines for {:?}, got {}",
        command.to_command_string(),
        lines.len()
    )))
}
