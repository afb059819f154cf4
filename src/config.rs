// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const APP_ID: &str = "io.github.sethcottle.DmVault";
pub const APP_NAME: &str = "dmvault";

pub const DEFAULT_SERVICE: &str = "https://i.instagram.com/api/v1";
pub const DEFAULT_USER_AGENT: &str = "dmvault/0.1 (Direct Message Backup)";

/// Directory that receives the record file and downloaded media.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Upper bound on the logout request made while shutting down.
pub const LOGOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Record file written inside the output directory.
pub const RECORD_FILE_NAME: &str = "dump_file.csv";
