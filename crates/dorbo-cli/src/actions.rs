//! Subcommands of the `dorbo` tool.
//!
//! Each action runs against an already open [`Controller`] and writes its
//! human-readable result to `out`.

use std::io::Write;
use std::path::PathBuf;

use clap::Subcommand;
use dorbo_protocol::{Controller, Credential, Transport};
use serde::Serialize;
use tracing::info;

use crate::error::CliError;
use crate::fobs::parse_fob_list;

/// Highest number of slots addressable with an 8-bit storage index.
const MAX_ADDRESSABLE_SLOTS: usize = u8::MAX as usize + 1;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// List every stored credential as "index facility user"
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the credential stored at an index
    Get {
        index: u8,
    },
    /// Store a credential at an index
    Set {
        index: u8,
        facility: u8,
        user: u16,
    },
    /// Reset every stored credential to "0 0"
    Clear,
    /// Show the storage capacity
    Info,
    /// Pulse a door strike
    Open {
        door: u8,
    },
    /// Replace the stored credentials with a fob list ("facility user" per line)
    Sync {
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct Entry {
    index: usize,
    #[serde(flatten)]
    credential: Credential,
}

/// Outcome of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    /// Slots whose value changed.
    pub written: usize,
    /// Slots already holding the wanted value.
    pub unchanged: usize,
}

/// Run one action.
pub fn run<T: Transport>(
    controller: &mut Controller<T>,
    action: &Action,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match action {
        Action::List { json } => {
            let credentials = controller.list_wiegand26()?;
            if *json {
                let entries: Vec<Entry> = credentials
                    .into_iter()
                    .enumerate()
                    .map(|(index, credential)| Entry { index, credential })
                    .collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                for (index, credential) in credentials.iter().enumerate() {
                    writeln!(out, "{} {}", index, credential)?;
                }
            }
        }
        Action::Get { index } => {
            let credential = controller.get_wiegand26(*index)?;
            writeln!(out, "{} {}", index, credential)?;
        }
        Action::Set { index, facility, user } => {
            controller.set_wiegand26(*index, Credential::new(*facility, *user))?;
        }
        Action::Clear => controller.clear_wiegand26()?,
        Action::Info => {
            let info = controller.storage_info()?;
            writeln!(out, "w26 {}", info.w26_capacity)?;
        }
        Action::Open { door } => controller.open_door(*door)?,
        Action::Sync { file } => {
            let text = std::fs::read_to_string(file).map_err(|source| CliError::ReadFile {
                path: file.clone(),
                source,
            })?;
            let fobs = parse_fob_list(&text)?;
            let summary = sync(controller, &fobs)?;
            writeln!(
                out,
                "{} slots written, {} unchanged",
                summary.written, summary.unchanged
            )?;
        }
    }
    Ok(())
}

/// Make the controller hold exactly `fobs`: fob *k* at index *k*, every
/// remaining slot cleared. Slots that already hold the wanted value are not
/// rewritten.
pub fn sync<T: Transport>(
    controller: &mut Controller<T>,
    fobs: &[Credential],
) -> Result<SyncSummary, CliError> {
    let current = controller.list_wiegand26()?;
    let capacity = current.len().min(MAX_ADDRESSABLE_SLOTS);
    if fobs.len() > capacity {
        return Err(CliError::TooManyFobs {
            count: fobs.len(),
            capacity,
        });
    }

    let mut summary = SyncSummary { written: 0, unchanged: 0 };
    for (index, stored) in current.iter().take(capacity).enumerate() {
        let wanted = fobs.get(index).copied().unwrap_or(Credential::EMPTY);
        if *stored == wanted {
            summary.unchanged += 1;
            continue;
        }
        // `capacity` never exceeds the 8-bit index range.
        controller.set_wiegand26(index as u8, wanted)?;
        summary.written += 1;
    }

    info!(
        fobs = fobs.len(),
        written = summary.written,
        unchanged = summary.unchanged,
        "sync complete"
    );
    Ok(summary)
}
