//! CLI exit codes.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | The pass failed (undecodable source, sink write failure)  |
//! | 2    | Usage or configuration error (bad args, unreadable file)  |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Pass failure - the source could not be decoded or the output not written.
pub const EXIT_PASS: u8 = 1;

/// Usage error - bad arguments, unknown dataset, missing file, bad settings.
pub const EXIT_USAGE: u8 = 2;
