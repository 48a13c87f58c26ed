//! Pump command payload.

/// Length of a status-update command.
pub const COMMAND_LEN: usize = 15;

/// Leading byte of every command.
const COMMAND_PREFIX: u8 = 0x41;
/// "Update status" command type.
const UPDATE_STATUS: u8 = 0x02;

/// Encode a pump on/off instruction.
///
/// Layout: prefix, command type, pump mode (1 on / 0 off), cycle mode (unused,
/// always 0), duration as big-endian `u16`, then nine zero bytes of cycle
/// parameters.
pub fn encode_pump_command(turn_on: bool, duration_secs: u16) -> [u8; COMMAND_LEN] {
    let mut command = [0u8; COMMAND_LEN];
    command[0] = COMMAND_PREFIX;
    command[1] = UPDATE_STATUS;
    command[2] = u8::from(turn_on);
    command[3] = 0;
    command[4..6].copy_from_slice(&duration_secs.to_be_bytes());
    command
}
