//! Command implementations for the obu CLI
//!
//! Each command resolves credentials, fetches what the selection needs and
//! renders into a buffer. The buffer reaches stdout only when the whole
//! command succeeded.

pub mod mirror;
pub mod proxy;
pub mod registry;
pub mod translate;

use crate::utils::errors::{ObuError, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use std::io::Write;

/// Namespace the OpenShift controller manager publishes CA bundles in
pub const CONTROLLER_MANAGER_NAMESPACE: &str = "openshift-controller-manager";

/// Printed when a command is run without choosing what to print
pub const USAGE_HINT: &str = "Use one of the available options listed under help to get\n\
content that can be stored in files, parameters, or environment\n\
variables that can be subsequently consumed by your image\n\
build tool.\n";

/// Write the usage hint
pub fn usage_hint(out: &mut impl Write) -> Result<()> {
    out.write_all(USAGE_HINT.as_bytes())?;
    Ok(())
}

/// Copy a rendered buffer to stdout
pub fn emit(buf: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(buf)?;
    stdout.flush()?;
    Ok(())
}

/// Look up a CA bundle in a config map; `subject` names it in errors
pub(crate) fn ca_bundle<'a>(config_map: &'a ConfigMap, key: &str, subject: &str) -> Result<&'a str> {
    let data = config_map
        .data
        .as_ref()
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ObuError::MissingData(format!("{} CA data is not available", subject)))?;

    data.get(key)
        .map(String::as_str)
        .ok_or_else(|| ObuError::MissingData(format!("{} CA data has not been set", subject)))
}
